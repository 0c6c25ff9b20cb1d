pub mod audit;
pub mod blob;
pub mod clock;

pub use audit::AuditSink;
pub use blob::BlobStore;
pub use clock::{Clock, FixedClock, SystemClock};
