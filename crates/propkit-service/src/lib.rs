//! propkit service
//!
//! Process-wide registry of named, shared property managers.
//!
//! # Core Concepts
//!
//! - [`PropertyManagerDataService`]: name → [`SharedPropertyManager`] map
//! - [`RegistryConfig`]: TOML description of managers to pre-register
//!
//! # Example
//!
//! ```rust
//! use propkit_core::PropertyManager;
//! use propkit_service::{share, PropertyManagerDataService};
//!
//! let service = PropertyManagerDataService::new();
//! let mut manager = PropertyManager::new();
//! manager.declare_value("bank", 1, "").unwrap();
//! service.add("reduction", share(manager)).unwrap();
//!
//! let shared = service.retrieve("reduction").unwrap();
//! shared.write().set_property("bank", 2).unwrap();
//! assert_eq!(service.retrieve("reduction").unwrap().read().get_value::<i32>("bank").unwrap(), 2);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod data_service;
pub mod error;

// Re-exports
pub use config::{ManagerConfig, PropertyConfig, RegistryConfig};
pub use data_service::{share, PropertyManagerDataService, SharedPropertyManager, HIDDEN_PREFIX};
pub use error::{ConfigError, DataServiceError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
