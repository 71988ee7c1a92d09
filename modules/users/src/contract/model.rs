use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Pure user model shared between layers (no serde; REST DTOs live in `api::rest::dto`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new user; `id` and `created_at` are assigned on insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// The only fields that may change after creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactUpdate {
    pub email: String,
    pub phone: String,
}

/// Case-insensitive substring filters for listings. Empty means "no constraint".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserFilters {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserFilters {
    /// Drops blank values so that `?first_name=` behaves like an absent filter.
    pub fn new(first_name: Option<String>, last_name: Option<String>) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Self {
            first_name: keep(first_name),
            last_name: keep(last_name),
        }
    }
}
