use crate::extension::registry::ExtensionError;
use crate::store::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store construction and access errors.
///
/// Absent records are never errors; lookups return `Option` instead.
#[derive(Debug)]
pub enum StoreError {
    InvalidConfig(ConfigError),
    Extension(ExtensionError),
    /// Entity type is not part of the store configuration.
    UnknownEntity(String),
    /// No store has been provided to the current thread.
    MissingContext,
    Decode(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfig(err) => write!(f, "invalid store config: {err}"),
            Self::Extension(err) => write!(f, "{err}"),
            Self::UnknownEntity(name) => write!(f, "unknown entity type: `{name}`"),
            Self::MissingContext => {
                write!(f, "store cannot be null, please add a context provider")
            }
            Self::Decode(err) => write!(f, "record does not match attribute type: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidConfig(err) => Some(err),
            Self::Extension(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::UnknownEntity(_) | Self::MissingContext => None,
        }
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::InvalidConfig(value)
    }
}

impl From<ExtensionError> for StoreError {
    fn from(value: ExtensionError) -> Self {
        Self::Extension(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}
