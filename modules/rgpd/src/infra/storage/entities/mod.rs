pub mod audit_events;
pub mod consents;
pub mod disputes;
pub mod export_bundles;
pub mod oppositions;
pub mod requests;
pub mod suspensions;
pub mod usage_records;
pub mod users;
