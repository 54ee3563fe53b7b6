/*!
 * # Permissions Module
 *
 * Permissions are `<resource>:<action>` strings carried in token claims.
 * `<resource>:*` grants every action on a resource and `*` grants everything.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const WAREHOUSES: &'static str = "warehouses";
    pub const STOCKS: &'static str = "stocks";
    pub const PRODUCT_PRICES: &'static str = "product-prices";
    pub const STOCK_TRANSACTIONS: &'static str = "stock-transactions";
    pub const CATEGORIES: &'static str = "categories";
    pub const BRANDS: &'static str = "brands";
    pub const PRODUCTS: &'static str = "products";
    pub const VARIANTS: &'static str = "variants";
    pub const USERS: &'static str = "users";
    pub const ADDRESSES: &'static str = "addresses";

    pub const ALL: &'static [&'static str] = &[
        Self::WAREHOUSES,
        Self::STOCKS,
        Self::PRODUCT_PRICES,
        Self::STOCK_TRANSACTIONS,
        Self::CATEGORIES,
        Self::BRANDS,
        Self::PRODUCTS,
        Self::VARIANTS,
        Self::USERS,
        Self::ADDRESSES,
    ];
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Inventory & pricing ledger
    pub const WAREHOUSES_READ: &str = "warehouses:read";
    pub const WAREHOUSES_CREATE: &str = "warehouses:create";
    pub const WAREHOUSES_UPDATE: &str = "warehouses:update";
    pub const WAREHOUSES_DELETE: &str = "warehouses:delete";

    pub const STOCKS_READ: &str = "stocks:read";
    pub const STOCKS_CREATE: &str = "stocks:create";
    pub const STOCKS_UPDATE: &str = "stocks:update";
    pub const STOCKS_DELETE: &str = "stocks:delete";

    pub const PRODUCT_PRICES_READ: &str = "product-prices:read";
    pub const PRODUCT_PRICES_CREATE: &str = "product-prices:create";
    pub const PRODUCT_PRICES_UPDATE: &str = "product-prices:update";
    pub const PRODUCT_PRICES_DELETE: &str = "product-prices:delete";

    pub const STOCK_TRANSACTIONS_READ: &str = "stock-transactions:read";
    pub const STOCK_TRANSACTIONS_CREATE: &str = "stock-transactions:create";
    pub const STOCK_TRANSACTIONS_UPDATE: &str = "stock-transactions:update";
    pub const STOCK_TRANSACTIONS_DELETE: &str = "stock-transactions:delete";

    // Catalog
    pub const CATEGORIES_READ: &str = "categories:read";
    pub const CATEGORIES_CREATE: &str = "categories:create";
    pub const CATEGORIES_UPDATE: &str = "categories:update";
    pub const CATEGORIES_DELETE: &str = "categories:delete";

    pub const BRANDS_READ: &str = "brands:read";
    pub const BRANDS_CREATE: &str = "brands:create";
    pub const BRANDS_UPDATE: &str = "brands:update";
    pub const BRANDS_DELETE: &str = "brands:delete";

    pub const PRODUCTS_READ: &str = "products:read";
    pub const PRODUCTS_CREATE: &str = "products:create";
    pub const PRODUCTS_UPDATE: &str = "products:update";
    pub const PRODUCTS_DELETE: &str = "products:delete";

    pub const VARIANTS_READ: &str = "variants:read";
    pub const VARIANTS_CREATE: &str = "variants:create";
    pub const VARIANTS_UPDATE: &str = "variants:update";
    pub const VARIANTS_DELETE: &str = "variants:delete";

    // Accounts
    pub const USERS_READ: &str = "users:read";
    pub const USERS_CREATE: &str = "users:create";
    pub const USERS_UPDATE: &str = "users:update";
    pub const USERS_DELETE: &str = "users:delete";

    pub const ADDRESSES_READ: &str = "addresses:read";
    pub const ADDRESSES_CREATE: &str = "addresses:create";
    pub const ADDRESSES_UPDATE: &str = "addresses:update";
    pub const ADDRESSES_DELETE: &str = "addresses:delete";
}

/// Format a permission string
pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

/// Every concrete permission the API checks.
pub fn all_permissions() -> Vec<String> {
    let actions = [
        Actions::READ,
        Actions::CREATE,
        Actions::UPDATE,
        Actions::DELETE,
    ];
    Resources::ALL
        .iter()
        .flat_map(|resource| {
            actions
                .iter()
                .map(move |action| format_permission(resource, action))
        })
        .collect()
}

/// Check if a permission is implied by another permission
pub fn is_permission_implied(user_perm: &str, required_perm: &str) -> bool {
    if user_perm == required_perm || user_perm == Actions::ALL {
        return true;
    }

    match (user_perm.split_once(':'), required_perm.split_once(':')) {
        (Some((user_resource, user_action)), Some((required_resource, _))) => {
            user_resource == required_resource && user_action == Actions::ALL
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_follow_resource_action_format() {
        assert_eq!(
            format_permission(Resources::PRODUCT_PRICES, Actions::CREATE),
            consts::PRODUCT_PRICES_CREATE
        );
        assert_eq!(
            format_permission(Resources::STOCK_TRANSACTIONS, Actions::READ),
            consts::STOCK_TRANSACTIONS_READ
        );
    }

    #[test]
    fn all_permissions_cover_every_resource_action() {
        let perms = all_permissions();
        assert_eq!(perms.len(), Resources::ALL.len() * 4);
        assert!(perms.contains(&consts::ADDRESSES_DELETE.to_string()));
    }

    #[test]
    fn wildcards_imply_concrete_permissions() {
        assert!(is_permission_implied("stocks:*", consts::STOCKS_UPDATE));
        assert!(is_permission_implied("*", consts::USERS_DELETE));
        assert!(!is_permission_implied("stocks:*", consts::WAREHOUSES_READ));
        assert!(!is_permission_implied("stocks:read", consts::STOCKS_UPDATE));
    }
}
