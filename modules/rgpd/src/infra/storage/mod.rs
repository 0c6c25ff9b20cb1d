pub mod entities;
pub mod mapper;
pub mod memory;
pub mod schema;
pub mod sea_orm_repo;
