//! Sync configuration and runtime errors.

use crate::model::record::{AttributeError, PRIMARY_KEY};
use crate::repo::record_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Fatal errors raised while configuring a sync policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncConfigError {
    UnknownMasterType(String),
    UnknownSlaveType(String),
    MissingRelationship,
    /// Composite or multi-key relationships are not supported.
    MultipleRelationshipPairs(usize),
    InvalidFieldName(String),
    /// Mapping onto the slave primary key would retarget slave updates.
    PrimaryKeyDestination(String),
    AlreadyConfigured(String),
}

impl Display for SyncConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownMasterType(name) => write!(f, "unknown master entity type `{name}`"),
            Self::UnknownSlaveType(name) => write!(f, "cannot resolve slave entity type `{name}`"),
            Self::MissingRelationship => {
                write!(f, "relationship must supply one master/slave key pair")
            }
            Self::MultipleRelationshipPairs(count) => write!(
                f,
                "relationship supports exactly one key pair, got {count}"
            ),
            Self::InvalidFieldName(name) => write!(f, "invalid field name `{name}`"),
            Self::PrimaryKeyDestination(source) => write!(
                f,
                "mapping `{source}` cannot write the slave primary key `{PRIMARY_KEY}`"
            ),
            Self::AlreadyConfigured(name) => {
                write!(f, "sync already configured for master type `{name}`")
            }
        }
    }
}

impl Error for SyncConfigError {}

/// Runtime errors of sync operations and the lifecycle host.
///
/// Persistence failures on the slave are carried unchanged and surface as a
/// failure of the triggering master save or destroy.
#[derive(Debug)]
pub enum SyncError {
    Repo(RepoError),
    Attribute(AttributeError),
    UnknownEntity(String),
    NotConfigured(String),
    NoSuchOperation { entity: String, operation: String },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Attribute(err) => write!(f, "{err}"),
            Self::UnknownEntity(name) => write!(f, "unknown entity type `{name}`"),
            Self::NotConfigured(name) => write!(f, "no sync policy configured for `{name}`"),
            Self::NoSuchOperation { entity, operation } => {
                write!(f, "undefined operation `{operation}` for `{entity}`")
            }
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Attribute(err) => Some(err),
            Self::UnknownEntity(_) | Self::NotConfigured(_) | Self::NoSuchOperation { .. } => None,
        }
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<AttributeError> for SyncError {
    fn from(value: AttributeError) -> Self {
        Self::Attribute(value)
    }
}
