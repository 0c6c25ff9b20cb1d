pub mod client;
pub mod error;
pub mod model;

pub use error::RgpdError;
pub use model::*;
