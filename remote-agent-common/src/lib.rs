pub mod config;
pub mod error;
pub mod eventhub;
pub mod helpers;
pub mod keys;
pub mod model;
pub mod secret;

pub use config::RemoteAgentConfig;
pub use error::AgentError;
pub use secret::Secret;
