use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{ContactUpdate, NewUser, User, UserFilters};
use crate::domain::error::DomainError;
use crate::domain::repo::{RepoError, UsersRepository};

/// Operations the REST layer consumes. `Service` is the production implementation;
/// handler tests substitute their own.
#[async_trait]
pub trait UsersService: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError>;
    /// `Ok(None)` when the user does not exist; the caller picks the status code.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    async fn list_users(
        &self,
        filters: &UserFilters,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<User>, DomainError>;
    async fn count_users(&self, filters: &UserFilters) -> Result<u64, DomainError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), DomainError>;
    async fn update_contact(&self, id: Uuid, contact: ContactUpdate) -> Result<User, DomainError>;
}

/// Domain service for user management.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    repo: Arc<dyn UsersRepository>,
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(repo: Arc<dyn UsersRepository>) -> Self {
        Self { repo }
    }
}

fn store_error(e: RepoError) -> DomainError {
    match e {
        RepoError::Store(inner) => DomainError::database(format!("{inner:#}")),
        RepoError::NotFound => DomainError::database("unexpected missing row"),
    }
}

#[async_trait]
impl UsersService for Service {
    #[instrument(
        name = "users.service.create_user",
        skip(self, new_user),
        fields(email = %new_user.email)
    )]
    async fn create_user(&self, new_user: NewUser) -> Result<User, DomainError> {
        info!("Creating new user");

        let user = self.repo.create(new_user).await.map_err(|e| {
            warn!(error = %e, "Failed to create user");
            store_error(e)
        })?;

        info!(user_id = %user.id, "Successfully created user");
        Ok(user)
    }

    #[instrument(name = "users.service.get_user", skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        debug!("Getting user by id");

        let user = self.repo.find_by_id(id).await.map_err(|e| {
            warn!(error = %e, "Failed to get user");
            store_error(e)
        })?;

        if user.is_none() {
            debug!("User not found");
        }
        Ok(user)
    }

    #[instrument(name = "users.service.list_users", skip(self))]
    async fn list_users(
        &self,
        filters: &UserFilters,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<User>, DomainError> {
        let users = self.repo.list(filters, offset, limit).await.map_err(|e| {
            warn!(error = %e, "Failed to list users");
            store_error(e)
        })?;

        debug!("Listed {} users", users.len());
        Ok(users)
    }

    #[instrument(name = "users.service.count_users", skip(self))]
    async fn count_users(&self, filters: &UserFilters) -> Result<u64, DomainError> {
        self.repo.count(filters).await.map_err(|e| {
            warn!(error = %e, "Failed to count users");
            store_error(e)
        })
    }

    #[instrument(name = "users.service.delete_user", skip(self), fields(user_id = %id))]
    async fn delete_user(&self, id: Uuid) -> Result<(), DomainError> {
        self.repo.delete(id).await.map_err(|e| {
            warn!(error = %e, "Failed to delete user");
            store_error(e)
        })?;

        info!("User deleted");
        Ok(())
    }

    #[instrument(
        name = "users.service.update_contact",
        skip(self, contact),
        fields(user_id = %id)
    )]
    async fn update_contact(&self, id: Uuid, contact: ContactUpdate) -> Result<User, DomainError> {
        // Load current; the update must not create rows
        let mut current = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch user before contact update");
                store_error(e)
            })?
            .ok_or_else(|| {
                info!("User not found for contact update");
                DomainError::user_not_found(id)
            })?;

        current.email = contact.email.clone();
        current.phone = contact.phone.clone();

        match self.repo.update_contact(id, contact).await {
            Ok(()) => {}
            // deleted between the read and the write
            Err(RepoError::NotFound) => return Err(DomainError::user_not_found(id)),
            Err(e) => {
                warn!(error = %e, "Failed to update contact");
                return Err(store_error(e));
            }
        }

        info!(email = %current.email, phone = %current.phone, "User contact updated");
        Ok(current)
    }
}
