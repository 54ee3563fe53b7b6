use crate::{
    entities::{address, user},
    errors::ServiceError,
    services::{
        on_unique_violation, page_offset,
        references::{dangling, find_by_slug, load_by_ids},
    },
    slug::{insert_with_unique_slug, slug_base},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_TAKEN: &str = "User already has a default address.";

#[derive(Debug, Clone)]
pub struct AddressDetail {
    pub address: address::Model,
    pub user_email: String,
}

fn address_slug_base(email: &str, city: &str, address_id: Uuid) -> String {
    let suffix: String = address_id.simple().to_string().chars().take(6).collect();
    slug_base(&format!("{}-{}-{}", email, city, suffix), "address")
}

fn default_conflict() -> ServiceError {
    ServiceError::field("is_default", DEFAULT_TAKEN)
}

/// Postal addresses, at most one default per user
#[derive(Clone)]
pub struct AddressService {
    db: Arc<DatabaseConnection>,
}

impl AddressService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Add an address; a second default for the same user is rejected
    #[instrument(skip(self))]
    pub async fn create_address(
        &self,
        input: CreateAddressInput,
    ) -> Result<AddressDetail, ServiceError> {
        let owner = self.find_owner(input.user_id).await?;

        if input.is_default && self.has_default(owner.id).await? {
            return Err(default_conflict());
        }

        let address_id = Uuid::new_v4();
        let base = address_slug_base(&owner.email, &input.city, address_id);
        let address = insert_with_unique_slug(
            &*self.db,
            address::Column::Slug,
            &base,
            |slug| address::ActiveModel {
                id: Set(address_id),
                user_id: Set(owner.id),
                full_name: Set(input.full_name.clone()),
                street_address: Set(input.street_address.clone()),
                city: Set(input.city.clone()),
                state: Set(input.state.clone()),
                postal_code: Set(input.postal_code.clone()),
                country: Set(input.country.clone()),
                is_default: Set(input.is_default),
                slug: Set(slug),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| on_unique_violation(e, default_conflict))?;

        info!("Created address {} for user {}", address.slug, owner.id);
        Ok(AddressDetail {
            address,
            user_email: owner.email,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_address(&self, slug: &str) -> Result<AddressDetail, ServiceError> {
        let address = self.find_address(slug).await?;
        let owner = self.owner_of(&address).await?;
        Ok(AddressDetail {
            address,
            user_email: owner.email,
        })
    }

    /// List addresses, newest first, optionally for a single user
    #[instrument(skip(self))]
    pub async fn list_addresses(
        &self,
        user_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<AddressDetail>, u64), ServiceError> {
        let mut query = address::Entity::find();
        if let Some(user_id) = user_id {
            query = query.filter(address::Column::UserId.eq(user_id));
        }

        let total = query.clone().count(&*self.db).await?;
        let addresses = query
            .order_by_desc(address::Column::CreatedAt)
            .order_by_desc(address::Column::Id)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        let owners = load_by_ids::<user::Entity, _, _>(
            &*self.db,
            user::Column::Id,
            addresses.iter().map(|a| a.user_id),
            |u| u.id,
        )
        .await?;

        let details = addresses
            .into_iter()
            .map(|address| {
                let user_email = owners
                    .get(&address.user_id)
                    .map(|u| u.email.clone())
                    .ok_or_else(|| dangling("Address", address.id, "user"))?;
                Ok(AddressDetail {
                    address,
                    user_email,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        Ok((details, total))
    }

    /// Partially update an address.
    ///
    /// Promoting a non-default address to default clears the owner's previous
    /// default within the same transaction.
    #[instrument(skip(self))]
    pub async fn update_address(
        &self,
        slug: &str,
        input: UpdateAddressInput,
    ) -> Result<AddressDetail, ServiceError> {
        let address = self.find_address(slug).await?;
        let owner = match input.user_id {
            Some(user_id) => self.find_owner(user_id).await?,
            None => self.owner_of(&address).await?,
        };
        let promote = input.is_default == Some(true) && !address.is_default;

        let address_id = address.id;
        let mut active: address::ActiveModel = address.into();
        active.user_id = Set(owner.id);
        if let Some(full_name) = input.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(street_address) = input.street_address {
            active.street_address = Set(street_address);
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
        if let Some(is_default) = input.is_default {
            active.is_default = Set(is_default);
        }

        let txn = self.db.begin().await?;
        if promote {
            let cleared = address::Entity::update_many()
                .col_expr(address::Column::IsDefault, Expr::value(false))
                .col_expr(address::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(address::Column::UserId.eq(owner.id))
                .filter(address::Column::IsDefault.eq(true))
                .filter(address::Column::Id.ne(address_id))
                .exec(&txn)
                .await?;
            info!(
                "Cleared {} previous default address(es) for user {}",
                cleared.rows_affected, owner.id
            );
        }
        let address = active
            .update(&txn)
            .await
            .map_err(|e| on_unique_violation(e.into(), default_conflict))?;
        txn.commit().await?;

        info!("Updated address: {}", address_id);
        Ok(AddressDetail {
            address,
            user_email: owner.email,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_address(&self, slug: &str) -> Result<(), ServiceError> {
        let address = self.find_address(slug).await?;
        let address_id = address.id;
        address.delete(&*self.db).await?;
        info!("Deleted address: {}", address_id);
        Ok(())
    }

    async fn find_address(&self, slug: &str) -> Result<address::Model, ServiceError> {
        find_by_slug::<address::Entity, _>(&*self.db, address::Column::Slug, slug, "Address").await
    }

    async fn find_owner(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::reference(
                    "user_id",
                    format!("Invalid pk \"{}\" - object does not exist.", user_id),
                )
            })
    }

    async fn owner_of(&self, address: &address::Model) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(address.user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| dangling("Address", address.id, "user"))
    }

    async fn has_default(&self, user_id: Uuid) -> Result<bool, ServiceError> {
        let defaults = address::Entity::find()
            .filter(address::Column::UserId.eq(user_id))
            .filter(address::Column::IsDefault.eq(true))
            .count(&*self.db)
            .await?;
        Ok(defaults > 0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateAddressInput {
    pub user_id: Uuid,
    pub full_name: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateAddressInput {
    pub user_id: Option<Uuid>,
    pub full_name: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub is_default: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_combines_email_city_and_id_prefix() {
        let id = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000000").unwrap();
        assert_eq!(
            address_slug_base("jane.doe@example.com", "Paris", id),
            "janedoeexamplecom-paris-a1b2c3"
        );
    }
}
