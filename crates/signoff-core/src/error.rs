//! Error types for signoff

use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Illegal transition: trigger '{trigger}' is not permitted from state '{state}'")]
    IllegalTransition { state: String, trigger: String },

    #[error("Plugin load error ({source_path}): {reason}")]
    PluginLoad { source_path: String, reason: String },

    #[error("Filter '{0}' is already registered")]
    DuplicateFilter(String),

    #[error("StepId has already been defined - {0}")]
    StepIdAssigned(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create an illegal transition error
    pub fn illegal_transition(state: impl Into<String>, trigger: impl Into<String>) -> Self {
        Error::IllegalTransition {
            state: state.into(),
            trigger: trigger.into(),
        }
    }

    /// Create a plugin load error for one bundle source
    pub fn plugin_load(source_path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PluginLoad {
            source_path: source_path.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// True for errors raised while wiring an engine rather than running one
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
