use crate::{
    entities::{product, stock, variant, warehouse},
    errors::ServiceError,
    services::{
        on_unique_violation, page_offset,
        references::{
            dangling, load_by_ids, resolve_product_slug, resolve_variant_slug,
            resolve_warehouse_slug, variant_label,
        },
    },
    slug::{insert_with_unique_slug, slug_base},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub const DUPLICATE_STOCK: &str = "The fields product, variant, warehouse must make a unique set.";

/// Stock row together with the rows its keys point at
#[derive(Debug, Clone)]
pub struct StockDetail {
    pub stock: stock::Model,
    pub product: product::Model,
    pub variant: Option<variant::Model>,
    pub warehouse: warehouse::Model,
}

impl StockDetail {
    /// "<product> - <variant or Default> @ <warehouse>"
    pub fn label(&self) -> String {
        stock_label(&self.product, self.variant.as_ref(), &self.warehouse)
    }

    pub fn variant_label(&self) -> Option<String> {
        variant_label(self.variant.as_ref(), &self.product.name)
    }
}

pub fn stock_label(
    product: &product::Model,
    variant: Option<&variant::Model>,
    warehouse: &warehouse::Model,
) -> String {
    format!(
        "{} - {} @ {}",
        product.name,
        variant_label(variant, &product.name).unwrap_or_else(|| "Default".to_string()),
        warehouse.name
    )
}

fn stock_slug_base(
    product: &product::Model,
    variant: Option<&variant::Model>,
    warehouse: &warehouse::Model,
) -> String {
    let variant = variant_label(variant, &product.name).unwrap_or_else(|| "default".to_string());
    slug_base(
        &format!("{}-{}-{}", product.name, variant, warehouse.name),
        "stock",
    )
}

/// Attaches product, variant and warehouse rows to each stock row, one query per table.
pub(crate) async fn hydrate_stocks<C: ConnectionTrait>(
    db: &C,
    stocks: Vec<stock::Model>,
) -> Result<Vec<StockDetail>, ServiceError> {
    let products = load_by_ids::<product::Entity, _, _>(
        db,
        product::Column::Id,
        stocks.iter().map(|s| s.product_id),
        |p| p.id,
    )
    .await?;
    let variants = load_by_ids::<variant::Entity, _, _>(
        db,
        variant::Column::Id,
        stocks.iter().filter_map(|s| s.variant_id),
        |v| v.id,
    )
    .await?;
    let warehouses = load_by_ids::<warehouse::Entity, _, _>(
        db,
        warehouse::Column::Id,
        stocks.iter().map(|s| s.warehouse_id),
        |w| w.id,
    )
    .await?;

    stocks
        .into_iter()
        .map(|stock| {
            let product = products
                .get(&stock.product_id)
                .cloned()
                .ok_or_else(|| dangling("Stock", stock.id, "product"))?;
            let variant = match stock.variant_id {
                Some(id) => Some(
                    variants
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| dangling("Stock", stock.id, "variant"))?,
                ),
                None => None,
            };
            let warehouse = warehouses
                .get(&stock.warehouse_id)
                .cloned()
                .ok_or_else(|| dangling("Stock", stock.id, "warehouse"))?;
            Ok(StockDetail {
                stock,
                product,
                variant,
                warehouse,
            })
        })
        .collect()
}

/// Stock ledger: quantity counters per (product, variant, warehouse)
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a stock row for a product/variant/warehouse triple
    #[instrument(skip(self))]
    pub async fn create_stock(&self, input: CreateStockInput) -> Result<StockDetail, ServiceError> {
        let product = resolve_product_slug(&*self.db, &input.product_slug).await?;
        let variant = match input.variant_slug.as_deref() {
            Some(slug) => Some(resolve_variant_slug(&*self.db, slug).await?),
            None => None,
        };
        let warehouse = resolve_warehouse_slug(&*self.db, &input.warehouse_slug).await?;

        let variant_id = variant.as_ref().map(|v| v.id);
        self.ensure_unique_triple(product.id, variant_id, warehouse.id, None)
            .await?;

        let stock_id = Uuid::new_v4();
        let base = stock_slug_base(&product, variant.as_ref(), &warehouse);
        let stock = insert_with_unique_slug(&*self.db, stock::Column::Slug, &base, |slug| {
            stock::ActiveModel {
                id: Set(stock_id),
                slug: Set(slug),
                product_id: Set(product.id),
                variant_id: Set(variant_id),
                warehouse_id: Set(warehouse.id),
                quantity: Set(input.quantity),
                reserved_quantity: Set(input.reserved_quantity),
                min_quantity: Set(input.min_quantity),
                max_quantity: Set(input.max_quantity),
                is_active: Set(input.is_active),
                ..Default::default()
            }
        })
        .await
        .map_err(|e| {
            on_unique_violation(e, || {
                ServiceError::UniquenessConflict(DUPLICATE_STOCK.to_string())
            })
        })?;

        info!("Created stock: {} ({})", stock.slug, stock_id);
        Ok(StockDetail {
            stock,
            product,
            variant,
            warehouse,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_stock(&self, stock_id: Uuid) -> Result<StockDetail, ServiceError> {
        let stock = self.find_stock(stock_id).await?;
        let mut details = hydrate_stocks(&*self.db, vec![stock]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Stock {} not found", stock_id)))
    }

    /// List stock rows, newest first
    #[instrument(skip(self))]
    pub async fn list_stocks(
        &self,
        filter: StockFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<StockDetail>, u64), ServiceError> {
        let Some(query) = self.filtered_query(&filter).await? else {
            return Ok((Vec::new(), 0));
        };

        let total = query.clone().count(&*self.db).await?;
        let stocks = query
            .order_by_desc(stock::Column::CreatedAt)
            .order_by_desc(stock::Column::Id)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        Ok((hydrate_stocks(&*self.db, stocks).await?, total))
    }

    /// Partially update a stock row.
    ///
    /// Supplied slugs are re-resolved and the triple re-checked; the counters
    /// are stored as given.
    #[instrument(skip(self))]
    pub async fn update_stock(
        &self,
        stock_id: Uuid,
        input: UpdateStockInput,
    ) -> Result<StockDetail, ServiceError> {
        let current = self.get_stock(stock_id).await?;

        let product = match input.product_slug.as_deref() {
            Some(slug) => resolve_product_slug(&*self.db, slug).await?,
            None => current.product,
        };
        let variant = match input.variant_slug.as_deref() {
            Some(slug) => Some(resolve_variant_slug(&*self.db, slug).await?),
            None => current.variant,
        };
        let warehouse = match input.warehouse_slug.as_deref() {
            Some(slug) => resolve_warehouse_slug(&*self.db, slug).await?,
            None => current.warehouse,
        };

        let variant_id = variant.as_ref().map(|v| v.id);
        self.ensure_unique_triple(product.id, variant_id, warehouse.id, Some(stock_id))
            .await?;

        let mut active: stock::ActiveModel = current.stock.into();
        active.product_id = Set(product.id);
        active.variant_id = Set(variant_id);
        active.warehouse_id = Set(warehouse.id);
        if let Some(quantity) = input.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(reserved_quantity) = input.reserved_quantity {
            active.reserved_quantity = Set(reserved_quantity);
        }
        if let Some(min_quantity) = input.min_quantity {
            active.min_quantity = Set(min_quantity);
        }
        if let Some(max_quantity) = input.max_quantity {
            active.max_quantity = Set(max_quantity);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let stock = active.update(&*self.db).await.map_err(|e| {
            on_unique_violation(e.into(), || {
                ServiceError::UniquenessConflict(DUPLICATE_STOCK.to_string())
            })
        })?;

        info!("Updated stock: {}", stock_id);
        Ok(StockDetail {
            stock,
            product,
            variant,
            warehouse,
        })
    }

    /// Delete a stock row and, by cascade, its transactions
    #[instrument(skip(self))]
    pub async fn delete_stock(&self, stock_id: Uuid) -> Result<(), ServiceError> {
        let stock = self.find_stock(stock_id).await?;
        stock.delete(&*self.db).await?;
        info!("Deleted stock: {}", stock_id);
        Ok(())
    }

    async fn find_stock(&self, stock_id: Uuid) -> Result<stock::Model, ServiceError> {
        stock::Entity::find_by_id(stock_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock {} not found", stock_id)))
    }

    /// Builds the filtered query, or `None` when a filter slug matches nothing.
    async fn filtered_query(
        &self,
        filter: &StockFilter,
    ) -> Result<Option<Select<stock::Entity>>, ServiceError> {
        let mut query = stock::Entity::find();

        if let Some(slug) = filter.product_slug.as_deref() {
            let product = product::Entity::find()
                .filter(product::Column::Slug.eq(slug))
                .one(&*self.db)
                .await?;
            match product {
                Some(product) => query = query.filter(stock::Column::ProductId.eq(product.id)),
                None => return Ok(None),
            }
        }
        if let Some(slug) = filter.warehouse_slug.as_deref() {
            let warehouse = warehouse::Entity::find()
                .filter(warehouse::Column::Slug.eq(slug))
                .one(&*self.db)
                .await?;
            match warehouse {
                Some(warehouse) => {
                    query = query.filter(stock::Column::WarehouseId.eq(warehouse.id))
                }
                None => return Ok(None),
            }
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(stock::Column::IsActive.eq(is_active));
        }

        Ok(Some(query))
    }

    async fn ensure_unique_triple(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        warehouse_id: Uuid,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = stock::Entity::find()
            .filter(stock::Column::ProductId.eq(product_id))
            .filter(stock::Column::WarehouseId.eq(warehouse_id));
        query = match variant_id {
            Some(id) => query.filter(stock::Column::VariantId.eq(id)),
            None => query.filter(stock::Column::VariantId.is_null()),
        };
        if let Some(id) = exclude_id {
            query = query.filter(stock::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::UniquenessConflict(
                DUPLICATE_STOCK.to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateStockInput {
    pub product_slug: String,
    pub variant_slug: Option<String>,
    pub warehouse_slug: String,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub min_quantity: i32,
    pub max_quantity: i32,
    pub is_active: bool,
}

/// Absent slugs keep the current reference; a variant cannot be detached.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateStockInput {
    pub product_slug: Option<String>,
    pub variant_slug: Option<String>,
    pub warehouse_slug: Option<String>,
    pub quantity: Option<i32>,
    pub reserved_quantity: Option<i32>,
    pub min_quantity: Option<i32>,
    pub max_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StockFilter {
    pub product_slug: Option<String>,
    pub warehouse_slug: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::product::{ProductStatus, ProductType};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(name: &str) -> product::Model {
        let now = Utc::now();
        product::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: "p".into(),
            sku: None,
            product_type: ProductType::Simple,
            category_id: None,
            brand_id: None,
            short_description: None,
            description: None,
            status: ProductStatus::Draft,
            weight_grams: None,
            dimensions: None,
            country_of_origin: None,
            is_returnable: true,
            is_cod_allowed: true,
            seo_title: None,
            seo_description: None,
            metadata: serde_json::json!({}),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn variant(name: Option<&str>, sku: &str) -> variant::Model {
        let now = Utc::now();
        variant::Model {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            sku: sku.to_string(),
            slug: "v".into(),
            barcode: None,
            name: name.map(str::to_string),
            price: Decimal::ZERO,
            compare_at_price: None,
            cost_price: None,
            tax_code: None,
            weight_grams: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn warehouse(name: &str) -> warehouse::Model {
        let now = Utc::now();
        warehouse::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: "w".into(),
            address: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn label_uses_default_without_variant() {
        let label = stock_label(&product("Widget"), None, &warehouse("Central"));
        assert_eq!(label, "Widget - Default @ Central");
    }

    #[test]
    fn label_falls_back_to_product_and_sku_for_unnamed_variant() {
        let v = variant(None, "WID-1");
        let label = stock_label(&product("Widget"), Some(&v), &warehouse("Central"));
        assert_eq!(label, "Widget - Widget — WID-1 @ Central");
    }

    #[test]
    fn slug_base_combines_product_variant_and_warehouse() {
        let p = product("Widget");
        let w = warehouse("East Hub");
        assert_eq!(stock_slug_base(&p, None, &w), "widget-default-east-hub");

        let v = variant(Some("Large Red"), "WID-L");
        assert_eq!(
            stock_slug_base(&p, Some(&v), &w),
            "widget-large-red-east-hub"
        );
    }

    #[test]
    fn slug_base_falls_back_when_names_are_symbols() {
        let p = product("???");
        let w = warehouse("!!!");
        let v = variant(Some("**"), "X");
        assert_eq!(stock_slug_base(&p, Some(&v), &w), "stock");
    }
}
