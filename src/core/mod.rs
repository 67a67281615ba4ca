// Public modules
pub mod auth;
pub mod compiler;
pub mod config;
pub mod deploy;
pub mod error;
pub mod kubeflow;
pub mod params;
pub mod plugin;
pub mod registration;
pub mod trigger;

// Internal modules - not part of public API
pub(crate) mod slugify;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
