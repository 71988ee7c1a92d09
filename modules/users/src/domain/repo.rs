use crate::contract::model::{ContactUpdate, NewUser, User, UserFilters};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Failures a repository can report. Reads signal absence with `Option`,
/// so `NotFound` is only produced by writes that target an existing row.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("no row matched")]
    NotFound,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Insert a new row; the returned user carries the generated id and timestamp.
    async fn create(&self, new_user: NewUser) -> RepoResult<User>;
    /// Load a user by id.
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Matching users, newest first, sliced to `[offset, offset + limit)`.
    async fn list(&self, filters: &UserFilters, offset: u64, limit: u64) -> RepoResult<Vec<User>>;
    /// Number of users matching `filters`, ignoring paging.
    async fn count(&self, filters: &UserFilters) -> RepoResult<u64>;
    /// Delete by id. Deleting an absent id succeeds.
    async fn delete(&self, id: Uuid) -> RepoResult<()>;
    /// Overwrite `email` and `phone`; `RepoError::NotFound` when no row was affected.
    async fn update_contact(&self, id: Uuid, contact: ContactUpdate) -> RepoResult<()>;
}
