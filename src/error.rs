use thiserror::Error;

pub type Result<T = (), E = ParameterError> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Registry key not found: {0}")]
    NotFound(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Failed to launch process: {0}")]
    ProcessLaunch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl ParameterError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// True for argument validation failures, which are always raised
    /// before any registry call is made.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for ParameterError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_map_to_config() {
        let err: ParameterError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(matches!(err, ParameterError::Config(_)));
    }

    #[test]
    fn display_includes_context() {
        let err = ParameterError::invalid("An empty path was passed");
        assert_eq!(err.to_string(), "Invalid argument: An empty path was passed");
        assert!(err.is_invalid_argument());
    }
}
