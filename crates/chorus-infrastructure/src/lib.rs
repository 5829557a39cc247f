//! Infrastructure layer: configuration file loading and path resolution.

pub mod config_service;
pub mod dto;
pub mod paths;

pub use crate::config_service::{ConfigService, persona_registry, resolve_api_key};
pub use crate::dto::RootConfig;
pub use crate::paths::ChorusPaths;
