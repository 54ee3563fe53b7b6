//! Catalog endpoints: categories, brands, products and their variants
pub mod brands;
pub mod categories;
pub mod products;
pub mod variants;

pub use brands::brands_routes;
pub use categories::categories_routes;
pub use products::products_routes;
pub use variants::variants_routes;
