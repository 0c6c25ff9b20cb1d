pub mod local;

pub use local::RgpdLocalClient;
