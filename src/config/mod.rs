#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{EligibleArgs, RunArgs};
pub use toml_config::{StoreBackend, TomlConfig};
