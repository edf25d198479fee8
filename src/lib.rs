//! Profile Materializer Library
//!
//! Profiles are directories of configuration files that inherit from one or
//! more parent profiles. This crate resolves the inheritance graph into a
//! merge order, merges each file across that order by type, and writes the
//! result to a target directory.

pub mod cli;
pub mod config;
pub mod containers;
pub mod error;
pub mod format;
pub mod logging;
pub mod materialize;
pub mod merge;
pub mod namespace;
pub mod order;
pub mod profile;
pub mod tree;

pub use error::{ErrorCode, ProfileError, Result};
pub use materialize::{MaterializedConfig, Materializer, MergedProfiles};
pub use merge::{FileKind, FileMerger, MergedFile};
pub use namespace::ConfigNamespace;
pub use order::MergeSequence;
pub use profile::{DirectorySource, MemorySource, Profile, ProfileGraph, ProfileLayout, ProfileSource};
pub use tree::ConfigTree;
