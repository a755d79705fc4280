pub mod config;
pub mod domain;
pub mod error;
pub mod repositories;
pub mod services;
pub mod utils;

// Public, stable-ish API surface for consumers (CLI / other crates)

pub use crate::config::{
    AdditionsRefresh, Hive, MissingKeyPolicy, ParameterConfig, PolicyRefreshConfig, RegistryView,
};

pub use crate::domain::{RegistryValue, SimpleParameter, ValueKind};

pub use crate::error::{ParameterError, Result};

pub use crate::repositories::{
    CommandRunner, KeyAccess, MemoryStore, ProcessRunner, RecordingRunner, RegistryKey,
    RegistryStore,
};
#[cfg(windows)]
pub use crate::repositories::WinRegStore;

pub use crate::services::WindowsParameter;
#[cfg(windows)]
pub use crate::services::SystemParameter;

pub use crate::utils::is_admin;

pub mod prelude {
    pub use crate::config::ParameterConfig;
    pub use crate::domain::{RegistryValue, SimpleParameter, ValueKind};
    pub use crate::error::{ParameterError, Result};
    pub use crate::repositories::{ProcessRunner, RegistryKey, RegistryStore};
    pub use crate::services::WindowsParameter;
    #[cfg(windows)]
    pub use crate::services::SystemParameter;
}
