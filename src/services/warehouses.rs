use crate::{
    entities::warehouse,
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

const NAME_TAKEN: &str = "A warehouse with this name already exists.";

/// Warehouse directory
#[derive(Clone)]
pub struct WarehouseService {
    db: Arc<DatabaseConnection>,
}

impl WarehouseService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Register a warehouse; the slug is derived from its name
    #[instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        input: CreateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        self.ensure_unique_name(&input.name, None).await?;

        let warehouse_id = Uuid::new_v4();
        let base = slug_base(&input.name, "warehouse");
        let warehouse = insert_with_unique_slug(
            &*self.db,
            warehouse::Column::Slug,
            &base,
            |slug| warehouse::ActiveModel {
                id: Set(warehouse_id),
                name: Set(input.name.clone()),
                slug: Set(slug),
                address: Set(input.address.clone()),
                city: Set(input.city.clone()),
                state: Set(input.state.clone()),
                postal_code: Set(input.postal_code.clone()),
                country: Set(input.country.clone()),
                is_active: Set(input.is_active),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| on_unique_violation(e, || ServiceError::field("name", NAME_TAKEN)))?;

        info!("Created warehouse: {} ({})", warehouse.slug, warehouse_id);
        Ok(warehouse)
    }

    #[instrument(skip(self))]
    pub async fn get_warehouse(&self, slug: &str) -> Result<warehouse::Model, ServiceError> {
        find_by_slug::<warehouse::Entity, _>(&*self.db, warehouse::Column::Slug, slug, "Warehouse")
            .await
    }

    /// List warehouses ordered by name
    #[instrument(skip(self))]
    pub async fn list_warehouses(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<warehouse::Model>, u64), ServiceError> {
        let total = warehouse::Entity::find().count(&*self.db).await?;
        let warehouses = warehouse::Entity::find()
            .order_by_asc(warehouse::Column::Name)
            .order_by_asc(warehouse::Column::Id)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        Ok((warehouses, total))
    }

    /// Partially update a warehouse. The slug never changes.
    #[instrument(skip(self))]
    pub async fn update_warehouse(
        &self,
        slug: &str,
        input: UpdateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let warehouse = self.get_warehouse(slug).await?;
        if let Some(ref name) = input.name {
            self.ensure_unique_name(name, Some(warehouse.id)).await?;
        }

        let warehouse_id = warehouse.id;
        let mut active: warehouse::ActiveModel = warehouse.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(address) = input.address {
            active.address = Set(address);
        }
        if let Some(city) = input.city {
            active.city = Set(city);
        }
        if let Some(state) = input.state {
            active.state = Set(state);
        }
        if let Some(postal_code) = input.postal_code {
            active.postal_code = Set(postal_code);
        }
        if let Some(country) = input.country {
            active.country = Set(country);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let warehouse = active
            .update(&*self.db)
            .await
            .map_err(|e| on_unique_violation(e.into(), || ServiceError::field("name", NAME_TAKEN)))?;
        info!("Updated warehouse: {}", warehouse_id);
        Ok(warehouse)
    }

    /// Delete a warehouse together with its stock and warehouse-scoped prices
    #[instrument(skip(self))]
    pub async fn delete_warehouse(&self, slug: &str) -> Result<(), ServiceError> {
        let warehouse = self.get_warehouse(slug).await?;
        let warehouse_id = warehouse.id;
        warehouse.delete(&*self.db).await?;
        info!("Deleted warehouse: {}", warehouse_id);
        Ok(())
    }

    async fn ensure_unique_name(
        &self,
        name: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = warehouse::Entity::find().filter(warehouse::Column::Name.eq(name));
        if let Some(id) = exclude_id {
            query = query.filter(warehouse::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::field("name", NAME_TAKEN));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateWarehouseInput {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_active: bool,
}

/// `Some(None)` clears a nullable field; `None` leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub state: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub is_active: Option<bool>,
}
