pub mod entity;
pub mod schema;
pub mod sea_orm_repo;
