use crate::{
    entities::{product, variant},
    errors::ServiceError,
    services::{
        on_unique_violation, page_offset,
        references::{dangling, find_by_slug, load_by_ids, resolve_product_slug},
    },
    slug::{insert_with_unique_slug, slug_base},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const SKU_TAKEN: &str = "variant with this sku already exists.";

#[derive(Debug, Clone)]
pub struct VariantDetail {
    pub variant: variant::Model,
    pub product: product::Model,
}

fn variant_slug_base(name: Option<&str>, sku: &str) -> String {
    let source = name.filter(|n| !n.trim().is_empty()).unwrap_or(sku);
    slug_base(source, "variant")
}

#[derive(Clone)]
pub struct VariantService {
    db: Arc<DatabaseConnection>,
}

impl VariantService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_variant(
        &self,
        input: CreateVariantInput,
    ) -> Result<VariantDetail, ServiceError> {
        let product = resolve_product_slug(&*self.db, &input.product_slug).await?;
        self.ensure_unique_sku(&input.sku, None).await?;

        let variant_id = Uuid::new_v4();
        let base = variant_slug_base(input.name.as_deref(), &input.sku);
        let variant = insert_with_unique_slug(&*self.db, variant::Column::Slug, &base, |slug| {
            variant::ActiveModel {
                id: Set(variant_id),
                product_id: Set(product.id),
                sku: Set(input.sku.clone()),
                slug: Set(slug),
                barcode: Set(input.barcode.clone()),
                name: Set(input.name.clone()),
                price: Set(input.price),
                compare_at_price: Set(input.compare_at_price),
                cost_price: Set(input.cost_price),
                tax_code: Set(input.tax_code.clone()),
                weight_grams: Set(input.weight_grams),
                is_active: Set(input.is_active),
                ..Default::default()
            }
        })
        .await
        .map_err(|e| on_unique_violation(e, || ServiceError::field("sku", SKU_TAKEN)))?;

        info!(
            "Created variant {} for product {}",
            variant_id, product.id
        );
        Ok(VariantDetail { variant, product })
    }

    #[instrument(skip(self))]
    pub async fn get_variant(&self, slug: &str) -> Result<VariantDetail, ServiceError> {
        let variant = self.find_variant(slug).await?;
        let product = self.owning_product(&variant).await?;
        Ok(VariantDetail { variant, product })
    }

    /// List variants ordered by name, optionally for one product
    #[instrument(skip(self))]
    pub async fn list_variants(
        &self,
        product_slug: Option<String>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<VariantDetail>, u64), ServiceError> {
        let mut query = variant::Entity::find();
        if let Some(slug) = product_slug.as_deref() {
            let product = product::Entity::find()
                .filter(product::Column::Slug.eq(slug))
                .one(&*self.db)
                .await?;
            match product {
                Some(product) => query = query.filter(variant::Column::ProductId.eq(product.id)),
                None => return Ok((Vec::new(), 0)),
            }
        }

        let total = query.clone().count(&*self.db).await?;
        let variants = query
            .order_by_asc(variant::Column::Name)
            .order_by_asc(variant::Column::Sku)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        let products = load_by_ids::<product::Entity, _, _>(
            &*self.db,
            product::Column::Id,
            variants.iter().map(|v| v.product_id),
            |p| p.id,
        )
        .await?;

        let details = variants
            .into_iter()
            .map(|variant| {
                let product = products
                    .get(&variant.product_id)
                    .cloned()
                    .ok_or_else(|| dangling("Variant", variant.id, "product"))?;
                Ok(VariantDetail { variant, product })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok((details, total))
    }

    #[instrument(skip(self))]
    pub async fn update_variant(
        &self,
        slug: &str,
        input: UpdateVariantInput,
    ) -> Result<VariantDetail, ServiceError> {
        let variant = self.find_variant(slug).await?;
        let product = match input.product_slug.as_deref() {
            Some(slug) => resolve_product_slug(&*self.db, slug).await?,
            None => self.owning_product(&variant).await?,
        };
        if let Some(ref sku) = input.sku {
            self.ensure_unique_sku(sku, Some(variant.id)).await?;
        }

        let variant_id = variant.id;
        let mut active: variant::ActiveModel = variant.into();
        active.product_id = Set(product.id);
        if let Some(sku) = input.sku {
            active.sku = Set(sku);
        }
        if let Some(barcode) = input.barcode {
            active.barcode = Set(barcode);
        }
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(compare_at_price) = input.compare_at_price {
            active.compare_at_price = Set(Some(compare_at_price));
        }
        if let Some(cost_price) = input.cost_price {
            active.cost_price = Set(Some(cost_price));
        }
        if let Some(tax_code) = input.tax_code {
            active.tax_code = Set(tax_code);
        }
        if let Some(weight_grams) = input.weight_grams {
            active.weight_grams = Set(Some(weight_grams));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let variant = active
            .update(&*self.db)
            .await
            .map_err(|e| on_unique_violation(e.into(), || ServiceError::field("sku", SKU_TAKEN)))?;
        info!("Updated variant: {}", variant_id);
        Ok(VariantDetail { variant, product })
    }

    /// Delete a variant with its stock and prices
    #[instrument(skip(self))]
    pub async fn delete_variant(&self, slug: &str) -> Result<(), ServiceError> {
        let variant = self.find_variant(slug).await?;
        let variant_id = variant.id;
        variant.delete(&*self.db).await?;
        info!("Deleted variant: {}", variant_id);
        Ok(())
    }

    async fn find_variant(&self, slug: &str) -> Result<variant::Model, ServiceError> {
        find_by_slug::<variant::Entity, _>(&*self.db, variant::Column::Slug, slug, "Variant").await
    }

    async fn owning_product(&self, variant: &variant::Model) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(variant.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| dangling("Variant", variant.id, "product"))
    }

    async fn ensure_unique_sku(
        &self,
        sku: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = variant::Entity::find().filter(variant::Column::Sku.eq(sku));
        if let Some(id) = exclude_id {
            query = query.filter(variant::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::field("sku", SKU_TAKEN));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateVariantInput {
    pub product_slug: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub tax_code: Option<String>,
    pub weight_grams: Option<i32>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateVariantInput {
    pub product_slug: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<Option<String>>,
    pub name: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub tax_code: Option<Option<String>>,
    pub weight_grams: Option<i32>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_prefers_name_then_sku() {
        assert_eq!(variant_slug_base(Some("Large Red"), "WID-L"), "large-red");
        assert_eq!(variant_slug_base(None, "WID-L"), "wid-l");
        assert_eq!(variant_slug_base(Some("  "), "WID-L"), "wid-l");
        assert_eq!(variant_slug_base(Some("!!"), "%%"), "variant");
    }
}
