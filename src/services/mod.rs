// Inventory & pricing ledger
pub mod pricing;
pub mod stock_transactions;
pub mod stocks;
pub mod warehouses;

// Catalog
pub mod brands;
pub mod categories;
pub mod products;
pub mod variants;

// Accounts directory
pub mod addresses;
pub mod users;

// Shared lookup and hydration helpers
pub mod references;

use crate::errors::ServiceError;
use crate::slug::{is_slug_conflict, is_unique_violation};

/// Row offset of a 1-based `page`; saturates instead of overflowing.
pub(crate) fn page_offset(page: u64, per_page: u64) -> u64 {
    page.saturating_sub(1).saturating_mul(per_page)
}

/// Rewrites a unique-index violation into the domain error built by `conflict`.
///
/// Used for races the service-level pre-checks cannot close. Slug collisions
/// are left alone; the slug toolkit retries those itself.
pub(crate) fn on_unique_violation(
    err: ServiceError,
    conflict: impl FnOnce() -> ServiceError,
) -> ServiceError {
    match &err {
        ServiceError::DatabaseError(db_err)
            if is_unique_violation(db_err) && !is_slug_conflict(db_err) =>
        {
            conflict()
        }
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_saturates() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(u64::MAX, 100), u64::MAX);
    }
}
