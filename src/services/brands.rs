use crate::{
    entities::brand,
    errors::ServiceError,
    services::{on_unique_violation, page_offset, references::find_by_slug},
    slug::{insert_with_unique_slug, slug_base},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const NAME_TAKEN: &str = "brand with this name already exists.";

#[derive(Clone)]
pub struct BrandService {
    db: Arc<DatabaseConnection>,
}

impl BrandService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_brand(&self, input: CreateBrandInput) -> Result<brand::Model, ServiceError> {
        self.ensure_unique_name(&input.name, None).await?;

        let brand_id = Uuid::new_v4();
        let base = slug_base(&input.name, "brand");
        let brand = insert_with_unique_slug(&*self.db, brand::Column::Slug, &base, |slug| {
            brand::ActiveModel {
                id: Set(brand_id),
                name: Set(input.name.clone()),
                slug: Set(slug),
                description: Set(input.description.clone()),
                website: Set(input.website.clone()),
                is_active: Set(input.is_active),
                ..Default::default()
            }
        })
        .await
        .map_err(|e| on_unique_violation(e, || ServiceError::field("name", NAME_TAKEN)))?;

        info!("Created brand: {} ({})", brand.slug, brand_id);
        Ok(brand)
    }

    #[instrument(skip(self))]
    pub async fn get_brand(&self, slug: &str) -> Result<brand::Model, ServiceError> {
        find_by_slug::<brand::Entity, _>(&*self.db, brand::Column::Slug, slug, "Brand").await
    }

    #[instrument(skip(self))]
    pub async fn list_brands(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<brand::Model>, u64), ServiceError> {
        let total = brand::Entity::find().count(&*self.db).await?;
        let brands = brand::Entity::find()
            .order_by_asc(brand::Column::Name)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        Ok((brands, total))
    }

    #[instrument(skip(self))]
    pub async fn update_brand(
        &self,
        slug: &str,
        input: UpdateBrandInput,
    ) -> Result<brand::Model, ServiceError> {
        let brand = self.get_brand(slug).await?;
        if let Some(ref name) = input.name {
            self.ensure_unique_name(name, Some(brand.id)).await?;
        }

        let brand_id = brand.id;
        let mut active: brand::ActiveModel = brand.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(website) = input.website {
            active.website = Set(website);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let brand = active.update(&*self.db).await.map_err(|e| {
            on_unique_violation(e.into(), || ServiceError::field("name", NAME_TAKEN))
        })?;
        info!("Updated brand: {}", brand_id);
        Ok(brand)
    }

    #[instrument(skip(self))]
    pub async fn delete_brand(&self, slug: &str) -> Result<(), ServiceError> {
        let brand = self.get_brand(slug).await?;
        let brand_id = brand.id;
        brand.delete(&*self.db).await?;
        info!("Deleted brand: {}", brand_id);
        Ok(())
    }

    async fn ensure_unique_name(
        &self,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = brand::Entity::find().filter(brand::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(brand::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::field("name", NAME_TAKEN));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateBrandInput {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateBrandInput {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub is_active: Option<bool>,
}
