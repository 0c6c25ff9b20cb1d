pub mod audit;
pub mod blob;
pub mod crypto;
pub mod storage;
