pub mod collections;
pub mod config;
pub mod error;
pub mod types;

pub use config::PolicyConfig;
pub use error::{Error, Result};
pub use types::*;
