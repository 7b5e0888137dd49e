use std::path::PathBuf;

use gestalt_directive::ParseError;
use gestalt_loader::{LoadError, ServiceError};
use gestalt_repository::RepoError;
use thiserror::Error;

use crate::teardown::TeardownError;

/// Why one directive failed. Each failure counts as one error of its submission.
#[derive(Debug, Error)]
pub enum DirectiveError {
	#[error(transparent)]
	Parse(#[from] ParseError),

	#[error("service `{id}`: {source}")]
	Load {
		id: String,
		#[source]
		source: LoadError,
	},

	#[error(transparent)]
	Repo(#[from] RepoError),

	#[error("service `{id}`: {source}")]
	Service {
		id: String,
		#[source]
		source: ServiceError,
	},

	#[error("gestalt is closed")]
	Closed,
}

impl DirectiveError {
	/// Service id the failure concerns, when known.
	pub fn id(&self) -> Option<&str> {
		match self {
			Self::Load { id, .. } | Self::Service { id, .. } => Some(id),
			Self::Repo(RepoError::DuplicateId(id) | RepoError::NotFound(id)) => Some(id),
			_ => None,
		}
	}
}

/// Errors loading configuration or directive files.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or shape.
	#[error("invalid config {path}: {error}")]
	Toml {
		path: PathBuf,
		error: toml::de::Error,
	},
}

/// Errors from the process-wide runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("runtime is already initialized")]
	AlreadyInitialized,

	#[error("runtime is not initialized")]
	NotInitialized,

	#[error("runtime has shut down")]
	ShutDown,

	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Teardown(#[from] TeardownError),
}
