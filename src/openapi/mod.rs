use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Back Office API",
        version = "1.0.0",
        description = r#"
# Back Office API

Inventory and pricing ledger for an e-commerce back office.

## Features

- **Warehouses**: Stocking locations addressed by slug
- **Stocks**: On-hand, reserved and threshold counters per product, variant and warehouse
- **Product Prices**: Global and per-warehouse price books
- **Stock Transactions**: Append-only movement log
- **Catalog**: Categories, brands, products and variants
- **Accounts**: Customers and their addresses

## Authentication

Every `/api/v1` endpoint except `/api/v1/status` requires a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

Issue one with the `issue-token` binary.

## Error Handling

```json
{
  "error": "Bad Request",
  "message": "Validation failed",
  "field_errors": { "name": ["This field may not be blank."] },
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20, capped at 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Warehouses", description = "Stocking locations"),
        (name = "Stocks", description = "Stock levels per product, variant and warehouse"),
        (name = "Product Prices", description = "Price books"),
        (name = "Stock Transactions", description = "Stock movement log"),
        (name = "Categories", description = "Catalog categories"),
        (name = "Brands", description = "Catalog brands"),
        (name = "Products", description = "Catalog products"),
        (name = "Variants", description = "Product variants"),
        (name = "Users", description = "Customer directory"),
        (name = "Addresses", description = "Customer addresses")
    ),
    paths(
        // Ledger
        crate::handlers::ledger::warehouses::list_warehouses,
        crate::handlers::ledger::warehouses::create_warehouse,
        crate::handlers::ledger::warehouses::get_warehouse,
        crate::handlers::ledger::warehouses::update_warehouse,
        crate::handlers::ledger::warehouses::delete_warehouse,
        crate::handlers::ledger::stocks::list_stocks,
        crate::handlers::ledger::stocks::create_stock,
        crate::handlers::ledger::stocks::get_stock,
        crate::handlers::ledger::stocks::update_stock,
        crate::handlers::ledger::stocks::delete_stock,
        crate::handlers::ledger::product_prices::list_product_prices,
        crate::handlers::ledger::product_prices::create_product_price,
        crate::handlers::ledger::product_prices::get_product_price,
        crate::handlers::ledger::product_prices::update_product_price,
        crate::handlers::ledger::product_prices::delete_product_price,
        crate::handlers::ledger::stock_transactions::list_stock_transactions,
        crate::handlers::ledger::stock_transactions::create_stock_transaction,
        crate::handlers::ledger::stock_transactions::get_stock_transaction,
        crate::handlers::ledger::stock_transactions::update_stock_transaction,
        crate::handlers::ledger::stock_transactions::delete_stock_transaction,

        // Catalog
        crate::handlers::catalog::categories::list_categories,
        crate::handlers::catalog::categories::create_category,
        crate::handlers::catalog::categories::get_category,
        crate::handlers::catalog::categories::update_category,
        crate::handlers::catalog::categories::delete_category,
        crate::handlers::catalog::brands::list_brands,
        crate::handlers::catalog::brands::create_brand,
        crate::handlers::catalog::brands::get_brand,
        crate::handlers::catalog::brands::update_brand,
        crate::handlers::catalog::brands::delete_brand,
        crate::handlers::catalog::products::list_products,
        crate::handlers::catalog::products::create_product,
        crate::handlers::catalog::products::get_product,
        crate::handlers::catalog::products::update_product,
        crate::handlers::catalog::products::delete_product,
        crate::handlers::catalog::variants::list_variants,
        crate::handlers::catalog::variants::create_variant,
        crate::handlers::catalog::variants::get_variant,
        crate::handlers::catalog::variants::update_variant,
        crate::handlers::catalog::variants::delete_variant,

        // Accounts
        crate::handlers::accounts::users::list_users,
        crate::handlers::accounts::users::create_user,
        crate::handlers::accounts::users::get_user,
        crate::handlers::accounts::users::update_user,
        crate::handlers::accounts::users::delete_user,
        crate::handlers::accounts::addresses::list_addresses,
        crate::handlers::accounts::addresses::create_address,
        crate::handlers::accounts::addresses::get_address,
        crate::handlers::accounts::addresses::update_address,
        crate::handlers::accounts::addresses::delete_address,
    ),
    components(
        schemas(
            crate::handlers::common::PaginationMeta,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource_with_bearer_auth() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        for path in [
            "/api/v1/warehouses",
            "/api/v1/stocks/{id}",
            "/api/v1/product-prices",
            "/api/v1/stock-transactions",
            "/api/v1/products/{slug}",
            "/api/v1/addresses",
        ] {
            assert!(json.contains(path), "missing {path}");
        }

        let components = openapi.components.expect("components");
        assert!(components.security_schemes.contains_key("Bearer"));
    }
}
