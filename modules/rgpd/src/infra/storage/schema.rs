//! Schema bootstrap derived from the entity definitions. Intended for
//! embedded SQLite deployments and the storage tests; server deployments
//! manage the same tables with their own migration tooling.

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

use super::entities::{
    audit_events, consents, disputes, export_bundles, oppositions, requests, suspensions,
    usage_records, users,
};

/// Create every table the engine needs, if it does not exist yet.
pub async fn create_all(db: &DatabaseConnection) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    macro_rules! create {
        ($entity:expr) => {{
            let mut stmt = schema.create_table_from_entity($entity);
            stmt.if_not_exists();
            db.execute(builder.build(&stmt)).await?;
        }};
    }

    create!(users::Entity);
    create!(consents::Entity);
    create!(requests::Entity);
    create!(export_bundles::Entity);
    create!(suspensions::Entity);
    create!(oppositions::Entity);
    create!(disputes::Entity);
    create!(usage_records::Entity);
    create!(audit_events::Entity);

    Ok(())
}
