//! Plain registry parameter record.

use super::value::RegistryValue;
use crate::error::{ParameterError, Result};
use serde::{Deserialize, Serialize};

/// A registry value address (`path` + `name`) with an optional value.
///
/// Every constructor validates the fields it accepts. Path and name never
/// change after construction; the value is only replaced by this crate after
/// a registry read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleParameter {
    path: Option<String>,
    name: String,
    value: Option<RegistryValue>,
}

impl SimpleParameter {
    /// Parameter addressed by key path and value name, value not yet known.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `path` or `name` is empty.
    pub fn with_path(path: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Ok(Self {
            path: Some(non_empty(path.into(), "path")?),
            name: non_empty(name.into(), "name")?,
            value: None,
        })
    }

    /// Parameter without a key path, typically an addition whose path is
    /// supplied elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `name` is empty or `value` is
    /// [`RegistryValue::None`].
    pub fn with_value(name: impl Into<String>, value: impl Into<RegistryValue>) -> Result<Self> {
        let name = non_empty(name.into(), "name")?;
        let value = value.into();
        if value == RegistryValue::None {
            return Err(ParameterError::invalid("An empty value was passed"));
        }
        Ok(Self {
            path: None,
            name,
            value: Some(value),
        })
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` if any of `path`, `name` or `value` is empty.
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<RegistryValue>,
    ) -> Result<Self> {
        let path = non_empty(path.into(), "path")?;
        let name = non_empty(name.into(), "name")?;
        let value = value.into();
        if value.is_empty() {
            return Err(ParameterError::invalid("An empty value was passed"));
        }
        Ok(Self {
            path: Some(path),
            name,
            value: Some(value),
        })
    }

    /// Record built from a registry read; skips validation since the host
    /// already holds this value.
    pub(crate) fn from_registry(path: &str, name: String, value: Option<RegistryValue>) -> Self {
        Self {
            path: Some(path.to_string()),
            name,
            value,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> Option<&RegistryValue> {
        self.value.as_ref()
    }

    pub(crate) fn replace_value(&mut self, value: Option<RegistryValue>) {
        self.value = value;
    }
}

fn non_empty(field: String, what: &str) -> Result<String> {
    if field.is_empty() {
        Err(ParameterError::invalid(format!("An empty {what} was passed")))
    } else {
        Ok(field)
    }
}
