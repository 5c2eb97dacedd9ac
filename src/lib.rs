pub mod config;
pub mod db;
pub mod error;

// Graph construction
pub mod corpus;
pub mod normalizer;
pub mod store;

// Ingredient resolution and ranking
pub mod recommend;

// Command-line surface
pub mod cli;

// Utilities
pub mod utils;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
