pub mod address;
pub mod config;
pub mod error;
pub mod types;

pub use address::{validate_address, validate_prefix};
pub use config::{BackendType, ConnectorConfig, RoutingConfig};
pub use error::CoreError;
pub use types::{AccountId, AccountInfo, ExecutionCondition, PreparePacket};
