//! Runtime configuration.
//!
//! Loaded from TOML. Every section and key is optional:
//!
//! ```toml
//! [repository]
//! capacity = 1024            # default gestalt max_size
//!
//! [loader]
//! search_paths = ["/opt/services/lib"]
//!
//! [directives]
//! files = ["svc.conf"]       # relative to the config file
//! ignore_missing = true
//! inline = ["static Logger \"-v\""]
//! ```
//!
//! The file comes from an explicit path, else from `$GESTALT_CONFIG`; with neither, defaults
//! apply. `$GESTALT_MODULE_PATH` (a platform path list) is searched before `loader.search_paths`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "GESTALT_CONFIG";
/// Environment variable listing extra module directories.
pub const MODULE_PATH_ENV: &str = "GESTALT_MODULE_PATH";

/// Default capacity of the process-wide gestalt.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
	pub repository: RepositoryConfig,
	pub loader: LoaderConfig,
	pub directives: DirectivesConfig,
	/// Directory of the file this config was read from.
	#[serde(skip)]
	pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
	pub capacity: usize,
}

impl Default for RepositoryConfig {
	fn default() -> Self {
		Self { capacity: DEFAULT_CAPACITY }
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
	pub search_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectivesConfig {
	pub files: Vec<PathBuf>,
	/// Skip directive files that do not exist instead of failing.
	pub ignore_missing: bool,
	pub inline: Vec<String>,
}

impl Default for DirectivesConfig {
	fn default() -> Self {
		Self {
			files: Vec::new(),
			ignore_missing: true,
			inline: Vec::new(),
		}
	}
}

impl RuntimeConfig {
	/// Parses a config from TOML text. `origin` is only used in errors.
	pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
		toml::from_str(text).map_err(|error| ConfigError::Toml {
			path: origin.to_path_buf(),
			error,
		})
	}

	/// Reads and parses `path`.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let mut config = Self::from_toml(&text, path)?;
		config.base_dir = path.parent().map(Path::to_path_buf);
		Ok(config)
	}

	/// Loads `explicit`, else `$GESTALT_CONFIG`, else returns defaults.
	pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
		if let Some(path) = explicit {
			return Self::load(path);
		}
		match std::env::var_os(CONFIG_ENV) {
			Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
			_ => Ok(Self::default()),
		}
	}

	/// Module directories: `$GESTALT_MODULE_PATH` entries first, then `loader.search_paths`.
	pub fn module_search_paths(&self) -> Vec<PathBuf> {
		self.search_paths_with(std::env::var_os(MODULE_PATH_ENV))
	}

	fn search_paths_with(&self, env: Option<OsString>) -> Vec<PathBuf> {
		let from_env = env.map(|v| std::env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect::<Vec<_>>());
		from_env
			.into_iter()
			.flatten()
			.chain(self.loader.search_paths.iter().map(|p| self.resolve(p)))
			.collect()
	}

	/// Directive files with relative paths resolved against the config file's directory.
	pub fn directive_files(&self) -> Vec<PathBuf> {
		self.directives.files.iter().map(|p| self.resolve(p)).collect()
	}

	fn resolve(&self, path: &Path) -> PathBuf {
		match &self.base_dir {
			Some(base) if path.is_relative() => base.join(path),
			_ => path.to_path_buf(),
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_text_is_all_defaults() {
		let config = RuntimeConfig::from_toml("", Path::new("mem")).unwrap();
		assert_eq!(config, RuntimeConfig::default());
		assert_eq!(config.repository.capacity, DEFAULT_CAPACITY);
		assert!(config.directives.ignore_missing);
	}

	#[test]
	fn sections_override_defaults() {
		let config = RuntimeConfig::from_toml(
			r#"
			[repository]
			capacity = 4

			[directives]
			ignore_missing = false
			inline = ["remove Nobody"]
			"#,
			Path::new("mem"),
		)
		.unwrap();
		assert_eq!(config.repository.capacity, 4);
		assert!(!config.directives.ignore_missing);
		assert_eq!(config.directives.inline, ["remove Nobody"]);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = RuntimeConfig::from_toml("[repository]\nsize = 3\n", Path::new("bad.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Toml { ref path, .. } if path == Path::new("bad.toml")));
	}

	#[test]
	fn env_paths_come_before_configured_ones() {
		let config = RuntimeConfig {
			loader: LoaderConfig {
				search_paths: vec![PathBuf::from("/cfg")],
			},
			..RuntimeConfig::default()
		};
		let env = std::env::join_paths(["/env/a", "/env/b"]).unwrap();
		assert_eq!(
			config.search_paths_with(Some(env)),
			[PathBuf::from("/env/a"), PathBuf::from("/env/b"), PathBuf::from("/cfg")]
		);
		assert_eq!(config.search_paths_with(None), [PathBuf::from("/cfg")]);
	}

	#[test]
	fn relative_paths_follow_the_config_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("gestalt.toml");
		std::fs::write(&path, "[directives]\nfiles = [\"svc.conf\", \"/abs/other.conf\"]\n[loader]\nsearch_paths = [\"lib\"]\n").unwrap();

		let config = RuntimeConfig::load(&path).unwrap();
		assert_eq!(config.directive_files(), [dir.path().join("svc.conf"), PathBuf::from("/abs/other.conf")]);
		assert_eq!(config.search_paths_with(None), [dir.path().join("lib")]);
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = RuntimeConfig::load(&dir.path().join("absent.toml")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
