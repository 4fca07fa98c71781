// Public API for integration tests and potential library usage

pub mod api;
pub mod config;
pub mod csv_import;
pub mod error;
pub mod source;
pub mod state;
pub mod types;
