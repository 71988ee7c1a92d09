//! Table bootstrap for fresh databases. This is not a migration system: it only
//! creates the `users` table from the entity definition when it is missing.

use anyhow::Context;
use sea_orm::{ConnectionTrait, Schema};
use tracing::info;

use crate::infra::storage::entity::Entity as UserEntity;

pub async fn create_table_if_missing<C>(conn: &C) -> anyhow::Result<()>
where
    C: ConnectionTrait,
{
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(UserEntity);
    table.if_not_exists();

    conn.execute(backend.build(&table))
        .await
        .context("create users table failed")?;

    info!("users table is present");
    Ok(())
}
