//! Inventory & pricing ledger endpoints
pub mod product_prices;
pub mod stock_transactions;
pub mod stocks;
pub mod warehouses;

pub use product_prices::product_prices_routes;
pub use stock_transactions::stock_transactions_routes;
pub use stocks::stocks_routes;
pub use warehouses::warehouses_routes;
