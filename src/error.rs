//! Structured error types for profile resolution and materialization.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::tree::TreeError;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Graph errors
    ProfileNotFound,
    CyclicInheritance,
    InvalidProfileName,

    // Content errors
    StructureConflict,
    InvalidDocument,

    // Output errors
    TargetNotEmpty,
    InvalidPath,
    IoFailure,

    // Container errors
    ContainerNotFound,
    UnknownContainerType,
}

/// Chain of profile names forming an inheritance cycle, first name repeated last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle(pub Vec<String>);

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" -> "))
    }
}

/// Errors raised while loading, ordering, merging or writing profiles.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("{}", not_found_message(.name, .referenced_by.as_deref()))]
    ProfileNotFound {
        name: String,
        referenced_by: Option<String>,
    },

    #[error("cyclic profile inheritance: {cycle}")]
    CyclicInheritance { cycle: Cycle },

    #[error("invalid profile name {name:?}")]
    InvalidProfileName { name: String },

    #[error("structure conflict in {file} of profile {profile}: {source}")]
    StructureConflict {
        profile: String,
        file: String,
        #[source]
        source: TreeError,
    },

    #[error("cannot parse {file} of profile {profile}: {message}")]
    Document {
        profile: String,
        file: String,
        message: String,
    },

    #[error("cannot read {namespace} settings from {file}: {message}")]
    Namespace {
        namespace: &'static str,
        file: String,
        message: String,
    },

    #[error("target directory {} is not empty", .path.display())]
    TargetNotEmpty { path: PathBuf },

    #[error("invalid output path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("container {name} not found in {}", .configs_dir.display())]
    ContainerNotFound { name: String, configs_dir: PathBuf },

    #[error("no reifier registered for container type {container_type} (container {container})")]
    UnknownContainerType {
        container: String,
        container_type: String,
    },
}

fn not_found_message(name: &str, referenced_by: Option<&str>) -> String {
    match referenced_by {
        Some(child) => format!("profile {} not found (declared as parent of {})", name, child),
        None => format!("profile {} not found", name),
    }
}

impl ProfileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ProfileNotFound { .. } => ErrorCode::ProfileNotFound,
            Self::CyclicInheritance { .. } => ErrorCode::CyclicInheritance,
            Self::InvalidProfileName { .. } => ErrorCode::InvalidProfileName,
            Self::StructureConflict { .. } => ErrorCode::StructureConflict,
            Self::Document { .. } | Self::Namespace { .. } => ErrorCode::InvalidDocument,
            Self::TargetNotEmpty { .. } => ErrorCode::TargetNotEmpty,
            Self::InvalidPath { .. } => ErrorCode::InvalidPath,
            Self::Io { .. } => ErrorCode::IoFailure,
            Self::ContainerNotFound { .. } => ErrorCode::ContainerNotFound,
            Self::UnknownContainerType { .. } => ErrorCode::UnknownContainerType,
        }
    }

    // Convenience constructors

    pub fn not_found(name: impl Into<String>, referenced_by: Option<&str>) -> Self {
        Self::ProfileNotFound {
            name: name.into(),
            referenced_by: referenced_by.map(str::to_string),
        }
    }

    pub fn cycle(chain: Vec<String>) -> Self {
        Self::CyclicInheritance {
            cycle: Cycle(chain),
        }
    }

    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn document(profile: &str, file: &str, err: impl fmt::Display) -> Self {
        Self::Document {
            profile: profile.to_string(),
            file: file.to_string(),
            message: err.to_string(),
        }
    }
}

/// Machine-readable rendering of an error, used by the CLI's JSON output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&ProfileError> for ErrorReport {
    fn from(err: &ProfileError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Result type for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;
