pub mod memory;
pub mod sea_orm;

pub use memory::MemoryAuditSink;
pub use sea_orm::SeaOrmAuditSink;
