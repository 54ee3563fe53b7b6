use crate::{
    entities::user,
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

const EMAIL_TAKEN: &str = "user with this email already exists.";

/// Lower-cases the domain part of an address and trims surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn user_slug_base(full_name: &str, email: &str) -> String {
    let source = if full_name.trim().is_empty() {
        email.split('@').next().unwrap_or_default()
    } else {
        full_name
    };
    slug_base(source, "user")
}

/// Customer directory
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        let email = normalize_email(&input.email);
        self.ensure_unique_email(&email, None).await?;

        let user_id = Uuid::new_v4();
        let base = user_slug_base(&input.full_name, &email);
        let user = insert_with_unique_slug(&*self.db, user::Column::Slug, &base, |slug| {
            user::ActiveModel {
                id: Set(user_id),
                email: Set(email.clone()),
                full_name: Set(input.full_name.clone()),
                phone: Set(input.phone.clone()),
                slug: Set(slug),
                is_active: Set(input.is_active),
                ..Default::default()
            }
        })
        .await
        .map_err(|e| on_unique_violation(e, || ServiceError::field("email", EMAIL_TAKEN)))?;

        info!("Created user: {} ({})", user.slug, user_id);
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, slug: &str) -> Result<user::Model, ServiceError> {
        find_by_slug::<user::Entity, _>(&*self.db, user::Column::Slug, slug, "User").await
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let total = user::Entity::find().count(&*self.db).await?;
        let users = user::Entity::find()
            .order_by_asc(user::Column::Email)
            .limit(per_page)
            .offset(page_offset(page, per_page))
            .all(&*self.db)
            .await?;

        Ok((users, total))
    }

    #[instrument(skip(self))]
    pub async fn update_user(
        &self,
        slug: &str,
        input: UpdateUserInput,
    ) -> Result<user::Model, ServiceError> {
        let user = self.get_user(slug).await?;
        let email = input.email.as_deref().map(normalize_email);
        if let Some(ref email) = email {
            self.ensure_unique_email(email, Some(user.id)).await?;
        }

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(full_name) = input.full_name {
            active.full_name = Set(full_name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let user = active.update(&*self.db).await.map_err(|e| {
            on_unique_violation(e.into(), || ServiceError::field("email", EMAIL_TAKEN))
        })?;
        info!("Updated user: {}", user_id);
        Ok(user)
    }

    /// Delete a user and their addresses
    #[instrument(skip(self))]
    pub async fn delete_user(&self, slug: &str) -> Result<(), ServiceError> {
        let user = self.get_user(slug).await?;
        let user_id = user.id;
        user.delete(&*self.db).await?;
        info!("Deleted user: {}", user_id);
        Ok(())
    }

    async fn ensure_unique_email(
        &self,
        email: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = exclude_id {
            query = query.filter(user::Column::Id.ne(id));
        }

        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::field("email", EMAIL_TAKEN));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CreateUserInput {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_domain_is_lowercased() {
        assert_eq!(
            normalize_email(" Jane.Doe@Example.COM "),
            "Jane.Doe@example.com"
        );
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn slug_uses_full_name_or_email_local_part() {
        assert_eq!(user_slug_base("Jane Doe", "jd@example.com"), "jane-doe");
        assert_eq!(user_slug_base("", "jane.doe@example.com"), "janedoe");
        assert_eq!(user_slug_base("", "@example.com"), "user");
    }
}
