pub mod audit;
pub mod consent;
pub mod error;
pub mod ports;
pub mod registers;
pub mod repo;
pub mod requests;
pub mod retention;
