pub mod capture_block;
pub mod config;
pub mod data_format;
pub mod error;
pub mod state;
pub mod summary;
