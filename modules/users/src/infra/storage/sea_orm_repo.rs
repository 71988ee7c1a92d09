//! SeaORM-backed repository implementation for the domain port.
//!
//! This struct is generic over `C: ConnectionTrait`, so you can construct it
//! with a `DatabaseConnection` **or** a transactional connection.

use anyhow::Context;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::contract::model::{ContactUpdate, NewUser, User, UserFilters};
use crate::domain::repo::{RepoError, RepoResult, UsersRepository};
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// `lower(column) LIKE '%value%'` with the value lower-cased as well.
fn contains_ci(col: Column, value: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(format!("%{}%", value.to_lowercase()))
}

fn apply_filters<Q: QueryFilter>(mut query: Q, filters: &UserFilters) -> Q {
    if let Some(first_name) = filters.first_name.as_deref().filter(|v| !v.is_empty()) {
        query = query.filter(contains_ci(Column::FirstName, first_name));
    }
    if let Some(last_name) = filters.last_name.as_deref().filter(|v| !v.is_empty()) {
        query = query.filter(contains_ci(Column::LastName, last_name));
    }
    query
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn create(&self, new_user: NewUser) -> RepoResult<User> {
        let m = UserAM {
            id: Set(Uuid::new_v4()),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            email: Set(new_user.email),
            phone: Set(new_user.phone),
            created_at: Set(Utc::now()),
        };
        let saved = m.insert(&self.conn).await.context("insert failed")?;
        debug!(user_id = %saved.id, "User row inserted");
        Ok(saved.into())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let found = UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        if found.is_none() {
            debug!(user_id = %id, "User row not found");
        }
        Ok(found.map(Into::into))
    }

    async fn list(&self, filters: &UserFilters, offset: u64, limit: u64) -> RepoResult<Vec<User>> {
        let rows = apply_filters(UserEntity::find(), filters)
            .order_by_desc(Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("list failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filters: &UserFilters) -> RepoResult<u64> {
        let total = apply_filters(UserEntity::find(), filters)
            .count(&self.conn)
            .await
            .context("count failed")?;
        Ok(total)
    }

    async fn delete(&self, id: Uuid) -> RepoResult<()> {
        let res = UserEntity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("delete failed")?;
        if res.rows_affected == 0 {
            debug!(user_id = %id, "User row already absent");
        }
        Ok(())
    }

    async fn update_contact(&self, id: Uuid, contact: ContactUpdate) -> RepoResult<()> {
        let res = UserEntity::update_many()
            .col_expr(Column::Email, Expr::value(contact.email))
            .col_expr(Column::Phone, Expr::value(contact.phone))
            .filter(Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("update_contact failed")?;
        if res.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
