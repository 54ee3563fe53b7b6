use crate::{
    entities::category,
    errors::ServiceError,
    services::{
        page_offset,
        references::{ensure_pk_exists, find_by_slug, load_by_ids},
    },
    slug::{insert_with_unique_slug, slug_base},
};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CategoryDetail {
    pub category: category::Model,
    pub parent_name: Option<String>,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryDetail, ServiceError> {
        if let Some(parent_id) = input.parent_id {
            ensure_pk_exists::<category::Entity, _>(
                &*self.db,
                category::Column::Id,
                "parent_id",
                parent_id,
            )
            .await?;
        }

        let category_id = Uuid::new_v4();
        let base = slug_base(&input.name, "category");
        let category = insert_with_unique_slug(
            &*self.db,
            category::Column::Slug,
            &base,
            |slug| category::ActiveModel {
                id: Set(category_id),
                name: Set(input.name.clone()),
                slug: Set(slug),
                description: Set(input.description.clone()),
                parent_id: Set(input.parent_id),
                is_active: Set(input.is_active),
                ..Default::default()
            },
        )
        .await?;

        info!("Created category: {} ({})", category.slug, category_id);
        self.with_parent(category).await
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, slug: &str) -> Result<CategoryDetail, ServiceError> {
        let category = self.find_category(slug).await?;
        self.with_parent(category).await
    }

    /// List categories ordered by name
    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<CategoryDetail>, u64), ServiceError> {
        let total = category::Entity::find().count(&*self.db).await?;
        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .order_by_asc(category::Column::Id)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        let parents = load_by_ids::<category::Entity, _, _>(
            &*self.db,
            category::Column::Id,
            categories.iter().filter_map(|c| c.parent_id),
            |c| c.id,
        )
        .await?;

        let details = categories
            .into_iter()
            .map(|category| CategoryDetail {
                parent_name: category
                    .parent_id
                    .and_then(|id| parents.get(&id))
                    .map(|parent| parent.name.clone()),
                category,
            })
            .collect();

        Ok((details, total))
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        slug: &str,
        input: UpdateCategoryInput,
    ) -> Result<CategoryDetail, ServiceError> {
        let category = self.find_category(slug).await?;

        if let Some(Some(parent_id)) = input.parent_id {
            if parent_id == category.id {
                return Err(ServiceError::field(
                    "parent_id",
                    "A category cannot be its own parent.",
                ));
            }
            ensure_pk_exists::<category::Entity, _>(
                &*self.db,
                category::Column::Id,
                "parent_id",
                parent_id,
            )
            .await?;
        }

        let category_id = category.id;
        let mut active: category::ActiveModel = category.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(parent_id) = input.parent_id {
            active.parent_id = Set(parent_id);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let category = active.update(&*self.db).await?;
        info!("Updated category: {}", category_id);
        self.with_parent(category).await
    }

    /// Delete a category; children and products keep existing with the link cleared
    #[instrument(skip(self))]
    pub async fn delete_category(&self, slug: &str) -> Result<(), ServiceError> {
        let category = self.find_category(slug).await?;
        let category_id = category.id;
        category.delete(&*self.db).await?;
        info!("Deleted category: {}", category_id);
        Ok(())
    }

    async fn find_category(&self, slug: &str) -> Result<category::Model, ServiceError> {
        find_by_slug::<category::Entity, _>(&*self.db, category::Column::Slug, slug, "Category")
            .await
    }

    async fn with_parent(&self, category: category::Model) -> Result<CategoryDetail, ServiceError> {
        let parent_name = match category.parent_id {
            Some(parent_id) => category::Entity::find_by_id(parent_id)
                .one(&*self.db)
                .await?
                .map(|parent| parent.name),
            None => None,
        };
        Ok(CategoryDetail {
            category,
            parent_name,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    /// `Some(None)` detaches the category from its parent
    pub parent_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}
