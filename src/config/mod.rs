//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CROWDFUND_* environment overrides
//!     → loader.rs (parse, deserialize, apply overrides)
//!     → validation.rs (semantic checks, network resolution)
//!     → AppConfig (validated, immutable)
//!     → network::resolve → NetworkEnvironment snapshot shared via Arc
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; switching networks is an explicit reconfigure
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, ConfirmationConfig, DisplayConfig, LedgerConfig, LogFormat, NetworkConfig,
    ObservabilityConfig, WalletsConfig,
};
pub use validation::ValidationError;
