pub mod config;
pub mod error;
pub mod risk;
pub mod usage;

pub use config::Config;
pub use error::*;
pub use risk::*;
pub use usage::*;
