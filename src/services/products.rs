use crate::{
    entities::{
        brand, category,
        product::{self, ProductStatus, ProductType},
    },
    errors::ServiceError,
    services::{
        on_unique_violation, page_offset,
        references::{ensure_pk_exists, find_by_slug, load_by_ids},
    },
    slug::{insert_with_unique_slug, slug_base},
};
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const SKU_TAKEN: &str = "product with this sku already exists.";
const PUBLISHED_NEEDS_CATEGORY: &str = "Published products must have a category assigned.";

#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: product::Model,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
}

/// Sortable product columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrderField {
    CreatedAt,
    UpdatedAt,
    Name,
}

/// `field` or `-field`; unknown fields fall back to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductOrdering {
    pub field: ProductOrderField,
    pub descending: bool,
}

impl Default for ProductOrdering {
    fn default() -> Self {
        Self {
            field: ProductOrderField::CreatedAt,
            descending: true,
        }
    }
}

impl ProductOrdering {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        let field = match name {
            "created_at" => ProductOrderField::CreatedAt,
            "updated_at" => ProductOrderField::UpdatedAt,
            "name" => ProductOrderField::Name,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    fn apply(self, query: Select<product::Entity>) -> Select<product::Entity> {
        let column = match self.field {
            ProductOrderField::CreatedAt => product::Column::CreatedAt,
            ProductOrderField::UpdatedAt => product::Column::UpdatedAt,
            ProductOrderField::Name => product::Column::Name,
        };
        if self.descending {
            query
                .order_by_desc(column)
                .order_by_desc(product::Column::Id)
        } else {
            query.order_by_asc(column).order_by_asc(product::Column::Id)
        }
    }
}

/// Every whitespace-separated term must appear, case-insensitively, in one of
/// name, slug, sku or the descriptions.
fn search_condition(search: &str) -> Condition {
    let columns = [
        product::Column::Name,
        product::Column::Slug,
        product::Column::Sku,
        product::Column::ShortDescription,
        product::Column::Description,
    ];

    search
        .split_whitespace()
        .fold(Condition::all(), |all, term| {
            let pattern = format!("%{}%", term.to_lowercase());
            let any = columns.iter().fold(Condition::any(), |any, column| {
                any.add(Expr::expr(Func::lower(Expr::col(*column))).like(pattern.clone()))
            });
            all.add(any)
        })
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a product
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        if let Some(ref sku) = input.sku {
            self.ensure_unique_sku(sku, None).await?;
        }
        self.ensure_references(input.category_id, input.brand_id)
            .await?;
        ensure_publishable(input.status, input.category_id)?;

        let product_id = Uuid::new_v4();
        let base = slug_base(&input.name, "product");
        let product = insert_with_unique_slug(&*self.db, product::Column::Slug, &base, |slug| {
            product::ActiveModel {
                id: Set(product_id),
                name: Set(input.name.clone()),
                slug: Set(slug),
                sku: Set(input.sku.clone()),
                product_type: Set(input.product_type),
                category_id: Set(input.category_id),
                brand_id: Set(input.brand_id),
                short_description: Set(input.short_description.clone()),
                description: Set(input.description.clone()),
                status: Set(input.status),
                weight_grams: Set(input.weight_grams),
                dimensions: Set(input.dimensions.clone()),
                country_of_origin: Set(input.country_of_origin.clone()),
                is_returnable: Set(input.is_returnable),
                is_cod_allowed: Set(input.is_cod_allowed),
                seo_title: Set(input.seo_title.clone()),
                seo_description: Set(input.seo_description.clone()),
                metadata: Set(input.metadata.clone()),
                is_active: Set(input.is_active),
                ..Default::default()
            }
        })
        .await
        .map_err(|e| on_unique_violation(e, || ServiceError::field("sku", SKU_TAKEN)))?;

        info!("Created product: {} ({})", product.slug, product_id);
        self.with_names(product).await
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> Result<ProductDetail, ServiceError> {
        let product = self.find_product(slug).await?;
        self.with_names(product).await
    }

    /// Filtered, searchable product listing
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductDetail>, u64), ServiceError> {
        let mut query = product::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(product::Column::Status.eq(status));
        }
        if let Some(category_id) = filter.category {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(brand_id) = filter.brand {
            query = query.filter(product::Column::BrandId.eq(brand_id));
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(product::Column::IsActive.eq(is_active));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query = query.filter(search_condition(search));
        }

        let total = query.clone().count(&*self.db).await?;
        let products = filter
            .ordering
            .apply(query)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        let categories = load_by_ids::<category::Entity, _, _>(
            &*self.db,
            category::Column::Id,
            products.iter().filter_map(|p| p.category_id),
            |c| c.id,
        )
        .await?;
        let brands = load_by_ids::<brand::Entity, _, _>(
            &*self.db,
            brand::Column::Id,
            products.iter().filter_map(|p| p.brand_id),
            |b| b.id,
        )
        .await?;

        let details = products
            .into_iter()
            .map(|product| ProductDetail {
                category_name: product
                    .category_id
                    .and_then(|id| categories.get(&id))
                    .map(|c| c.name.clone()),
                brand_name: product
                    .brand_id
                    .and_then(|id| brands.get(&id))
                    .map(|b| b.name.clone()),
                product,
            })
            .collect();

        Ok((details, total))
    }

    /// Partially update a product; the publish rule is checked on the merged state
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        slug: &str,
        input: UpdateProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        let product = self.find_product(slug).await?;

        if let Some(Some(ref sku)) = input.sku {
            self.ensure_unique_sku(sku, Some(product.id)).await?;
        }
        self.ensure_references(input.category_id.flatten(), input.brand_id.flatten())
            .await?;

        let status = input.status.unwrap_or(product.status);
        let category_id = input.category_id.unwrap_or(product.category_id);
        ensure_publishable(status, category_id)?;

        let product_id = product.id;
        let mut active: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(sku) = input.sku {
            active.sku = Set(sku);
        }
        if let Some(product_type) = input.product_type {
            active.product_type = Set(product_type);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(brand_id) = input.brand_id {
            active.brand_id = Set(brand_id);
        }
        if let Some(short_description) = input.short_description {
            active.short_description = Set(short_description);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(weight_grams) = input.weight_grams {
            active.weight_grams = Set(Some(weight_grams));
        }
        if let Some(dimensions) = input.dimensions {
            active.dimensions = Set(Some(dimensions));
        }
        if let Some(country_of_origin) = input.country_of_origin {
            active.country_of_origin = Set(country_of_origin);
        }
        if let Some(is_returnable) = input.is_returnable {
            active.is_returnable = Set(is_returnable);
        }
        if let Some(is_cod_allowed) = input.is_cod_allowed {
            active.is_cod_allowed = Set(is_cod_allowed);
        }
        if let Some(seo_title) = input.seo_title {
            active.seo_title = Set(seo_title);
        }
        if let Some(seo_description) = input.seo_description {
            active.seo_description = Set(seo_description);
        }
        if let Some(metadata) = input.metadata {
            active.metadata = Set(metadata);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let product = active
            .update(&*self.db)
            .await
            .map_err(|e| on_unique_violation(e.into(), || ServiceError::field("sku", SKU_TAKEN)))?;
        info!("Updated product: {}", product_id);
        self.with_names(product).await
    }

    /// Delete a product with its variants, stock and prices
    #[instrument(skip(self))]
    pub async fn delete_product(&self, slug: &str) -> Result<(), ServiceError> {
        let product = self.find_product(slug).await?;
        let product_id = product.id;
        product.delete(&*self.db).await?;
        info!("Deleted product: {}", product_id);
        Ok(())
    }

    async fn find_product(&self, slug: &str) -> Result<product::Model, ServiceError> {
        find_by_slug::<product::Entity, _>(&*self.db, product::Column::Slug, slug, "Product").await
    }

    async fn with_names(&self, product: product::Model) -> Result<ProductDetail, ServiceError> {
        let category_name = match product.category_id {
            Some(id) => category::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .map(|c| c.name),
            None => None,
        };
        let brand_name = match product.brand_id {
            Some(id) => brand::Entity::find_by_id(id)
                .one(&*self.db)
                .await?
                .map(|b| b.name),
            None => None,
        };
        Ok(ProductDetail {
            product,
            category_name,
            brand_name,
        })
    }

    async fn ensure_references(
        &self,
        category_id: Option<Uuid>,
        brand_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            ensure_pk_exists::<category::Entity, _>(
                &*self.db,
                category::Column::Id,
                "category_id",
                id,
            )
            .await?;
        }
        if let Some(id) = brand_id {
            ensure_pk_exists::<brand::Entity, _>(&*self.db, brand::Column::Id, "brand_id", id)
                .await?;
        }
        Ok(())
    }

    async fn ensure_unique_sku(
        &self,
        sku: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = product::Entity::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude_id {
            query = query.filter(product::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::field("sku", SKU_TAKEN));
        }
        Ok(())
    }
}

fn ensure_publishable(status: ProductStatus, category_id: Option<Uuid>) -> Result<(), ServiceError> {
    if status == ProductStatus::Published && category_id.is_none() {
        return Err(ServiceError::ValidationError(
            PUBLISHED_NEEDS_CATEGORY.to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateProductInput {
    pub name: String,
    pub sku: Option<String>,
    pub product_type: ProductType,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub status: ProductStatus,
    pub weight_grams: Option<i32>,
    pub dimensions: Option<JsonValue>,
    pub country_of_origin: Option<String>,
    pub is_returnable: bool,
    pub is_cod_allowed: bool,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub metadata: JsonValue,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub sku: Option<Option<String>>,
    pub product_type: Option<ProductType>,
    pub category_id: Option<Option<Uuid>>,
    pub brand_id: Option<Option<Uuid>>,
    pub short_description: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub status: Option<ProductStatus>,
    pub weight_grams: Option<i32>,
    pub dimensions: Option<JsonValue>,
    pub country_of_origin: Option<Option<String>>,
    pub is_returnable: Option<bool>,
    pub is_cod_allowed: Option<bool>,
    pub seo_title: Option<Option<String>>,
    pub seo_description: Option<Option<String>>,
    pub metadata: Option<JsonValue>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub category: Option<Uuid>,
    pub brand: Option<Uuid>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
    pub ordering: ProductOrdering,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("name", ProductOrderField::Name, false)]
    #[case("-name", ProductOrderField::Name, true)]
    #[case("updated_at", ProductOrderField::UpdatedAt, false)]
    #[case("-created_at", ProductOrderField::CreatedAt, true)]
    #[case("price", ProductOrderField::CreatedAt, true)]
    #[case("", ProductOrderField::CreatedAt, true)]
    fn ordering_parses_known_fields(
        #[case] raw: &str,
        #[case] field: ProductOrderField,
        #[case] descending: bool,
    ) {
        assert_eq!(
            ProductOrdering::parse(raw),
            ProductOrdering { field, descending }
        );
    }

    #[test]
    fn published_requires_category() {
        assert_matches!(
            ensure_publishable(ProductStatus::Published, None),
            Err(ServiceError::ValidationError(msg)) if msg == PUBLISHED_NEEDS_CATEGORY
        );
        assert!(ensure_publishable(ProductStatus::Published, Some(Uuid::new_v4())).is_ok());
        assert!(ensure_publishable(ProductStatus::Draft, None).is_ok());
    }
}
