//! Natural-key lookups shared by the services.
//!
//! Reference resolvers turn a caller-supplied slug or id into a row and report
//! a field-scoped error when nothing matches. The batch loaders back list
//! hydration so a page of rows costs one query per related table.

use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{product, stock, variant, warehouse};
use crate::errors::ServiceError;

/// Loads the row whose `column` equals `slug`, or `NotFound`.
pub async fn find_by_slug<E, C>(
    db: &C,
    column: E::Column,
    slug: &str,
    label: &str,
) -> Result<E::Model, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    E::find()
        .filter(column.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", label, slug)))
}

/// Loads every row whose `column` is one of `ids`, keyed by `key`.
pub async fn load_by_ids<E, C, F>(
    db: &C,
    column: E::Column,
    ids: impl IntoIterator<Item = Uuid>,
    key: F,
) -> Result<HashMap<Uuid, E::Model>, ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
    F: Fn(&E::Model) -> Uuid,
{
    let ids: HashSet<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = E::find().filter(column.is_in(ids)).all(db).await?;
    Ok(rows.into_iter().map(|row| (key(&row), row)).collect())
}

/// Fails with the primary-key reference error when no row has `id`.
pub async fn ensure_pk_exists<E, C>(
    db: &C,
    column: E::Column,
    field: &str,
    id: Uuid,
) -> Result<(), ServiceError>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let found = E::find().filter(column.eq(id)).one(db).await?;
    if found.is_none() {
        return Err(ServiceError::reference(
            field,
            format!("Invalid pk \"{}\" - object does not exist.", id),
        ));
    }
    Ok(())
}

pub async fn resolve_product_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<product::Model, ServiceError> {
    product::Entity::find()
        .filter(product::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::reference("product_slug", "Invalid product slug."))
}

pub async fn resolve_variant_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<variant::Model, ServiceError> {
    variant::Entity::find()
        .filter(variant::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::reference("variant_slug", "Invalid variant slug."))
}

pub async fn resolve_warehouse_slug<C: ConnectionTrait>(
    db: &C,
    slug: &str,
) -> Result<warehouse::Model, ServiceError> {
    warehouse::Entity::find()
        .filter(warehouse::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::reference("warehouse_slug", "Invalid warehouse slug."))
}

pub async fn resolve_stock_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<stock::Model, ServiceError> {
    stock::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::reference("stock_id", "Invalid stock ID."))
}

/// Error for a row whose foreign key points at nothing.
pub(crate) fn dangling(kind: &str, id: Uuid, target: &str) -> ServiceError {
    ServiceError::InternalError(format!("{} {} references a missing {}", kind, id, target))
}

/// Display label of an optional variant, given its product's name.
pub fn variant_label(variant: Option<&variant::Model>, product_name: &str) -> Option<String> {
    variant.map(|v| v.label(product_name))
}
