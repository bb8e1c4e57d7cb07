//! parla-core: shared error type and configuration loading

pub mod config;
pub mod error;

pub use config::{load_from_file, load_from_str, render, ConfigFormat, InstanceConfig};
pub use error::{Error, Result};
