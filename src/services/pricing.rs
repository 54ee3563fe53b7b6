use crate::{
    entities::{product, product_price, variant, warehouse},
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
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub const DUPLICATE_PRICE: &str = "The fields product, variant, warehouse must make a unique set.";

/// Price row with its product, optional variant and optional warehouse
#[derive(Debug, Clone)]
pub struct PriceDetail {
    pub price: product_price::Model,
    pub product: product::Model,
    pub variant: Option<variant::Model>,
    pub warehouse: Option<warehouse::Model>,
}

impl PriceDetail {
    pub fn variant_label(&self) -> Option<String> {
        variant_label(self.variant.as_ref(), &self.product.name)
    }
}

fn price_slug_base(
    product: &product::Model,
    variant: Option<&variant::Model>,
    warehouse: Option<&warehouse::Model>,
) -> String {
    let target = variant_label(variant, &product.name).unwrap_or_else(|| product.name.clone());
    let location = warehouse.map(|w| w.name.as_str()).unwrap_or("global");
    slug_base(&format!("{}-{}-price", target, location), "price")
}

async fn hydrate_prices<C: ConnectionTrait>(
    db: &C,
    prices: Vec<product_price::Model>,
) -> Result<Vec<PriceDetail>, ServiceError> {
    let products = load_by_ids::<product::Entity, _, _>(
        db,
        product::Column::Id,
        prices.iter().map(|p| p.product_id),
        |p| p.id,
    )
    .await?;
    let variants = load_by_ids::<variant::Entity, _, _>(
        db,
        variant::Column::Id,
        prices.iter().filter_map(|p| p.variant_id),
        |v| v.id,
    )
    .await?;
    let warehouses = load_by_ids::<warehouse::Entity, _, _>(
        db,
        warehouse::Column::Id,
        prices.iter().filter_map(|p| p.warehouse_id),
        |w| w.id,
    )
    .await?;

    prices
        .into_iter()
        .map(|price| {
            let product = products
                .get(&price.product_id)
                .cloned()
                .ok_or_else(|| dangling("Price", price.id, "product"))?;
            let variant = price
                .variant_id
                .map(|id| {
                    variants
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| dangling("Price", price.id, "variant"))
                })
                .transpose()?;
            let warehouse = price
                .warehouse_id
                .map(|id| {
                    warehouses
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| dangling("Price", price.id, "warehouse"))
                })
                .transpose()?;
            Ok(PriceDetail {
                price,
                product,
                variant,
                warehouse,
            })
        })
        .collect()
}

/// Price book. Rows without a warehouse are global prices; no precedence
/// between global and warehouse-scoped rows is applied anywhere.
#[derive(Clone)]
pub struct ProductPriceService {
    db: Arc<DatabaseConnection>,
}

impl ProductPriceService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a price entry
    #[instrument(skip(self))]
    pub async fn create_price(
        &self,
        input: CreateProductPriceInput,
    ) -> Result<PriceDetail, ServiceError> {
        let product = resolve_product_slug(&*self.db, &input.product_slug).await?;
        let variant = match input.variant_slug.as_deref() {
            Some(slug) => Some(resolve_variant_slug(&*self.db, slug).await?),
            None => None,
        };
        let warehouse = match input.warehouse_slug.as_deref() {
            Some(slug) => Some(resolve_warehouse_slug(&*self.db, slug).await?),
            None => None,
        };

        let variant_id = variant.as_ref().map(|v| v.id);
        let warehouse_id = warehouse.as_ref().map(|w| w.id);
        self.ensure_unique_key(product.id, variant_id, warehouse_id, None)
            .await?;

        let price_id = Uuid::new_v4();
        let base = price_slug_base(&product, variant.as_ref(), warehouse.as_ref());
        let price = insert_with_unique_slug(
            &*self.db,
            product_price::Column::Slug,
            &base,
            |slug| product_price::ActiveModel {
                id: Set(price_id),
                slug: Set(slug),
                product_id: Set(product.id),
                variant_id: Set(variant_id),
                warehouse_id: Set(warehouse_id),
                price: Set(input.price),
                compare_at_price: Set(input.compare_at_price),
                cost_price: Set(input.cost_price),
                currency: Set(input.currency.clone()),
                is_active: Set(input.is_active),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| {
            on_unique_violation(e, || {
                ServiceError::UniquenessConflict(DUPLICATE_PRICE.to_string())
            })
        })?;

        info!(
            "Created price {} for product {} ({})",
            price.slug,
            product.id,
            if warehouse.is_some() { "warehouse" } else { "global" }
        );
        Ok(PriceDetail {
            price,
            product,
            variant,
            warehouse,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_price(&self, price_id: Uuid) -> Result<PriceDetail, ServiceError> {
        let price = self.find_price(price_id).await?;
        let mut details = hydrate_prices(&*self.db, vec![price]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Product price {} not found", price_id)))
    }

    /// List prices, newest first
    #[instrument(skip(self))]
    pub async fn list_prices(
        &self,
        filter: ProductPriceFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<PriceDetail>, u64), ServiceError> {
        let Some(query) = self.filtered_query(&filter).await? else {
            return Ok((Vec::new(), 0));
        };

        let total = query.clone().count(&*self.db).await?;
        let prices = query
            .order_by_desc(product_price::Column::CreatedAt)
            .order_by_desc(product_price::Column::Id)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        Ok((hydrate_prices(&*self.db, prices).await?, total))
    }

    /// Partially update a price entry
    #[instrument(skip(self))]
    pub async fn update_price(
        &self,
        price_id: Uuid,
        input: UpdateProductPriceInput,
    ) -> Result<PriceDetail, ServiceError> {
        let current = self.get_price(price_id).await?;

        let product = match input.product_slug.as_deref() {
            Some(slug) => resolve_product_slug(&*self.db, slug).await?,
            None => current.product,
        };
        let variant = match input.variant_slug.as_deref() {
            Some(slug) => Some(resolve_variant_slug(&*self.db, slug).await?),
            None => current.variant,
        };
        let warehouse = match input.warehouse_slug.as_deref() {
            Some(slug) => Some(resolve_warehouse_slug(&*self.db, slug).await?),
            None => current.warehouse,
        };

        let variant_id = variant.as_ref().map(|v| v.id);
        let warehouse_id = warehouse.as_ref().map(|w| w.id);
        self.ensure_unique_key(product.id, variant_id, warehouse_id, Some(price_id))
            .await?;

        let mut active: product_price::ActiveModel = current.price.into();
        active.product_id = Set(product.id);
        active.variant_id = Set(variant_id);
        active.warehouse_id = Set(warehouse_id);
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(compare_at_price) = input.compare_at_price {
            active.compare_at_price = Set(Some(compare_at_price));
        }
        if let Some(cost_price) = input.cost_price {
            active.cost_price = Set(Some(cost_price));
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let price = active.update(&*self.db).await.map_err(|e| {
            on_unique_violation(e.into(), || {
                ServiceError::UniquenessConflict(DUPLICATE_PRICE.to_string())
            })
        })?;

        info!("Updated price: {}", price_id);
        Ok(PriceDetail {
            price,
            product,
            variant,
            warehouse,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_price(&self, price_id: Uuid) -> Result<(), ServiceError> {
        let price = self.find_price(price_id).await?;
        price.delete(&*self.db).await?;
        info!("Deleted price: {}", price_id);
        Ok(())
    }

    async fn find_price(&self, price_id: Uuid) -> Result<product_price::Model, ServiceError> {
        product_price::Entity::find_by_id(price_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product price {} not found", price_id)))
    }

    async fn filtered_query(
        &self,
        filter: &ProductPriceFilter,
    ) -> Result<Option<Select<product_price::Entity>>, ServiceError> {
        let mut query = product_price::Entity::find();

        if let Some(slug) = filter.product_slug.as_deref() {
            let product = product::Entity::find()
                .filter(product::Column::Slug.eq(slug))
                .one(&*self.db)
                .await?;
            match product {
                Some(product) => {
                    query = query.filter(product_price::Column::ProductId.eq(product.id))
                }
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
                    query = query.filter(product_price::Column::WarehouseId.eq(warehouse.id))
                }
                None => return Ok(None),
            }
        }
        if let Some(currency) = filter.currency.as_deref() {
            query = query.filter(product_price::Column::Currency.eq(currency.to_uppercase()));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(product_price::Column::IsActive.eq(is_active));
        }

        Ok(Some(query))
    }

    async fn ensure_unique_key(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        warehouse_id: Option<Uuid>,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query =
            product_price::Entity::find().filter(product_price::Column::ProductId.eq(product_id));
        query = match variant_id {
            Some(id) => query.filter(product_price::Column::VariantId.eq(id)),
            None => query.filter(product_price::Column::VariantId.is_null()),
        };
        query = match warehouse_id {
            Some(id) => query.filter(product_price::Column::WarehouseId.eq(id)),
            None => query.filter(product_price::Column::WarehouseId.is_null()),
        };
        if let Some(id) = exclude_id {
            query = query.filter(product_price::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::UniquenessConflict(
                DUPLICATE_PRICE.to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateProductPriceInput {
    pub product_slug: String,
    pub variant_slug: Option<String>,
    /// `None` creates a global price
    pub warehouse_slug: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    /// Upper-cased ISO currency code
    pub currency: String,
    pub is_active: bool,
}

/// Absent slugs keep the current reference; references cannot be detached.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateProductPriceInput {
    pub product_slug: Option<String>,
    pub variant_slug: Option<String>,
    pub warehouse_slug: Option<String>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductPriceFilter {
    pub product_slug: Option<String>,
    pub warehouse_slug: Option<String>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}
