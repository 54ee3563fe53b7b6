pub mod accounts;
pub mod catalog;
pub mod common;
pub mod ledger;

use crate::db::DbPool;
use crate::services::{
    addresses::AddressService, brands::BrandService, categories::CategoryService,
    pricing::ProductPriceService, products::ProductService,
    stock_transactions::StockTransactionService, stocks::StockService, users::UserService,
    variants::VariantService, warehouses::WarehouseService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub warehouses: Arc<WarehouseService>,
    pub stocks: Arc<StockService>,
    pub product_prices: Arc<ProductPriceService>,
    pub stock_transactions: Arc<StockTransactionService>,
    pub categories: Arc<CategoryService>,
    pub brands: Arc<BrandService>,
    pub products: Arc<ProductService>,
    pub variants: Arc<VariantService>,
    pub users: Arc<UserService>,
    pub addresses: Arc<AddressService>,
}

impl AppServices {
    /// Build every service over the shared connection pool.
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            warehouses: Arc::new(WarehouseService::new(db_pool.clone())),
            stocks: Arc::new(StockService::new(db_pool.clone())),
            product_prices: Arc::new(ProductPriceService::new(db_pool.clone())),
            stock_transactions: Arc::new(StockTransactionService::new(db_pool.clone())),
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            brands: Arc::new(BrandService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            variants: Arc::new(VariantService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool.clone())),
            addresses: Arc::new(AddressService::new(db_pool)),
        }
    }
}
