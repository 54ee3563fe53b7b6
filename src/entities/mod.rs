//! Database entities.
//!
//! Every entity stamps `created_at` on insert and refreshes `updated_at` on
//! every save through its `ActiveModelBehavior` impl.

pub mod address;
pub mod brand;
pub mod category;
pub mod product;
pub mod product_price;
pub mod stock;
pub mod stock_transaction;
pub mod user;
pub mod variant;
pub mod warehouse;

/// Implements `ActiveModelBehavior` with timestamp bookkeeping for the
/// entity module it is invoked in.
macro_rules! timestamped_active_model {
    () => {
        #[async_trait::async_trait]
        impl sea_orm::ActiveModelBehavior for ActiveModel {
            async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
            where
                C: ConnectionTrait,
            {
                let now = chrono::Utc::now();
                if insert && self.created_at.is_not_set() {
                    self.created_at = sea_orm::ActiveValue::Set(now);
                }
                self.updated_at = sea_orm::ActiveValue::Set(now);
                Ok(self)
            }
        }
    };
}

pub(crate) use timestamped_active_model;
