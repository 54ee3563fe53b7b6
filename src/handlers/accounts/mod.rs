//! Customer accounts: users and their addresses
pub mod addresses;
pub mod users;

pub use addresses::addresses_routes;
pub use users::users_routes;
