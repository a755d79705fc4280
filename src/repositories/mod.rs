//! Collaborators behind registry parameters: the key-value store and the
//! process runner used for policy refresh.

pub mod memory;
pub mod process;
#[cfg(windows)]
pub mod registry;

use crate::domain::RegistryValue;
use crate::error::Result;

pub use memory::MemoryStore;
pub use process::{CommandRunner, Launch, ProcessRunner, RecordingRunner};
#[cfg(windows)]
pub use registry::WinRegStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAccess {
    Read,
    Write,
}

/// An open registry key. Dropping it releases the handle.
pub trait RegistryKey {
    /// `Ok(None)` when the value does not exist.
    fn get_value(&self, name: &str) -> Result<Option<RegistryValue>>;

    fn set_value(&self, name: &str, value: &RegistryValue) -> Result;

    /// Value names in enumeration order.
    fn value_names(&self) -> Result<Vec<String>>;
}

/// Hierarchical path + value-name store rooted at one hive.
pub trait RegistryStore {
    type Key: RegistryKey;

    /// `Ok(None)` when the key does not exist.
    fn open_key(&self, path: &str, access: KeyAccess) -> Result<Option<Self::Key>>;

    /// Open the key for writing, creating it and any missing parents.
    fn create_key(&self, path: &str) -> Result<Self::Key>;
}

/// Drop empty segments and leading/trailing `\`. A `/` is an ordinary
/// character inside a key name (`MIME\Database\Content Type\text/html`).
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.split('\\')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\\")
}
