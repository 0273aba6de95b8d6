pub mod config;
pub mod types;

pub use config::VigilConfig;
pub use types::*;
