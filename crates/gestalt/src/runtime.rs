//! Process-wide runtime context.
//!
//! # Lifecycle
//!
//! 1. Startup: [`Runtime::init`] builds the loader and the default gestalt and registers the
//!    gestalt's teardown first, so it is destroyed after every later singleton.
//! 2. Steady state: any thread, including ones the runtime did not create, calls
//!    [`Runtime::attach`] and looks services up through the returned [`Attachment`].
//! 3. Shutdown: [`Runtime::shutdown`] runs the teardown pass once. Afterwards lookups find
//!    nothing and directives fail.
//!
//! The default gestalt is published before `init` returns, so it is visible to every thread that
//! attaches afterwards.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwapOption;
use gestalt_directive::directives;
use gestalt_loader::Loader;

use crate::config::RuntimeConfig;
use crate::error::{ConfigError, RuntimeError};
use crate::gestalt::Gestalt;
use crate::record::RecordView;
use crate::teardown::{RegistrationId, TeardownError, TeardownRegistry};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// The process-wide runtime: default gestalt, shared loader and teardown registry.
pub struct Runtime {
	config: RuntimeConfig,
	loader: Loader,
	default: ArcSwapOption<Gestalt>,
	teardown: TeardownRegistry,
	shut_down: AtomicBool,
}

impl Runtime {
	/// Initializes the runtime with a shared-library loader over the configured search paths.
	///
	/// # Errors
	///
	/// [`RuntimeError::AlreadyInitialized`] on every call after the first.
	pub fn init(config: RuntimeConfig) -> Result<&'static Runtime, RuntimeError> {
		let loader = Loader::with_search_paths(config.module_search_paths());
		Self::init_with_loader(config, loader)
	}

	/// Initializes the runtime with a caller-supplied loader.
	///
	/// The default gestalt is built and registered before the runtime becomes visible, so an
	/// [`attach`](Self::attach) that succeeds always sees it.
	pub fn init_with_loader(config: RuntimeConfig, loader: Loader) -> Result<&'static Runtime, RuntimeError> {
		let mut fresh = false;
		let runtime = RUNTIME.get_or_init(|| {
			fresh = true;
			Runtime::assemble(config, loader)
		});
		if !fresh {
			return Err(RuntimeError::AlreadyInitialized);
		}
		tracing::info!(capacity = runtime.config.repository.capacity, "runtime initialized");
		Ok(runtime)
	}

	fn assemble(config: RuntimeConfig, loader: Loader) -> Runtime {
		let gestalt = Arc::new(Gestalt::with_loader(config.repository.capacity, loader.clone()));
		let teardown = TeardownRegistry::new();
		let registered = teardown.register(
			Arc::clone(&gestalt),
			|gestalt, ()| {
				if let Some(runtime) = RUNTIME.get() {
					runtime.default.store(None);
				}
				gestalt.close();
			},
			(),
		);
		// A fresh registry is open and empty.
		if let Err(error) = registered {
			tracing::error!(%error, "default gestalt teardown not registered");
		}
		Runtime {
			config,
			loader,
			default: ArcSwapOption::from(Some(gestalt)),
			teardown,
			shut_down: AtomicBool::new(false),
		}
	}

	/// The initialized runtime.
	pub fn global() -> Result<&'static Runtime, RuntimeError> {
		RUNTIME.get().ok_or(RuntimeError::NotInitialized)
	}

	/// Attaches the calling thread to the runtime. Required before lookups from threads the
	/// runtime did not create.
	///
	/// # Errors
	///
	/// [`RuntimeError::NotInitialized`] before [`init`](Self::init), and
	/// [`RuntimeError::ShutDown`] after [`shutdown`](Self::shutdown).
	pub fn attach() -> Result<Attachment, RuntimeError> {
		let runtime = Self::global()?;
		if runtime.is_shut_down() {
			return Err(RuntimeError::ShutDown);
		}
		Ok(Attachment {
			runtime,
			_thread: PhantomData,
		})
	}

	pub fn config(&self) -> &RuntimeConfig {
		&self.config
	}

	pub fn loader(&self) -> &Loader {
		&self.loader
	}

	/// The default gestalt, `None` after shutdown.
	pub fn default_gestalt(&self) -> Option<Arc<Gestalt>> {
		self.default.load_full()
	}

	/// Creates an independent gestalt sharing the runtime's loader.
	pub fn new_gestalt(&self, capacity: usize) -> Gestalt {
		Gestalt::with_loader(capacity, self.loader.clone())
	}

	/// Processes `text` against the default gestalt and returns how many directives failed.
	/// After shutdown every directive fails.
	pub fn process_directive(&self, text: &str) -> usize {
		match self.default_gestalt() {
			Some(gestalt) => gestalt.process_directive(text),
			None => {
				let count = directives(text).count();
				tracing::warn!(directives = count, "directives submitted after shutdown");
				count
			}
		}
	}

	/// Processes a directive file against the default gestalt.
	pub fn process_file(&self, path: &Path) -> Result<usize, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Ok(self.process_directive(&text))
	}

	/// Processes the directive files and inline directives named by the configuration.
	///
	/// # Errors
	///
	/// A configured file that cannot be read, unless `directives.ignore_missing` is set and the
	/// file does not exist.
	pub fn process_configured(&self) -> Result<usize, ConfigError> {
		let mut errors = 0;
		for path in self.config.directive_files() {
			if self.config.directives.ignore_missing && !path.exists() {
				tracing::debug!(path = %path.display(), "skipping missing directive file");
				continue;
			}
			errors += self.process_file(&path)?;
		}
		for text in &self.config.directives.inline {
			errors += self.process_directive(text);
		}
		Ok(errors)
	}

	/// Registers a process-lifetime object for teardown at shutdown.
	///
	/// A [`TeardownError::DoubleRegistration`] is a caller bug: the object would otherwise be
	/// destroyed twice.
	#[must_use = "a failed teardown registration means the object is never cleaned up"]
	pub fn at_exit<T, C, F>(&self, object: Arc<T>, cleanup: F, context: C) -> Result<RegistrationId, TeardownError>
	where
		T: Send + Sync + 'static,
		C: Send + 'static,
		F: FnOnce(Arc<T>, C) + Send + 'static,
	{
		self.teardown.register(object, cleanup, context)
	}

	pub fn teardown(&self) -> &TeardownRegistry {
		&self.teardown
	}

	pub fn is_shut_down(&self) -> bool {
		self.shut_down.load(Ordering::Acquire)
	}

	/// Runs the teardown pass and returns how many cleanups ran.
	///
	/// Must not overlap with any other runtime call on another thread.
	///
	/// # Errors
	///
	/// [`RuntimeError::ShutDown`] if the pass already ran.
	pub fn shutdown(&self) -> Result<usize, RuntimeError> {
		if self.shut_down.swap(true, Ordering::AcqRel) {
			return Err(RuntimeError::ShutDown);
		}
		let ran = self.teardown.run();
		tracing::info!(cleanups = ran, "runtime shut down");
		Ok(ran)
	}
}

impl std::fmt::Debug for Runtime {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Runtime")
			.field("default", &self.default_gestalt())
			.field("teardown", &self.teardown)
			.field("shut_down", &self.is_shut_down())
			.finish()
	}
}

/// A thread's explicit attachment to the runtime.
///
/// Not `Send`: each thread attaches for itself.
#[derive(Debug, Clone)]
pub struct Attachment {
	runtime: &'static Runtime,
	_thread: PhantomData<*const ()>,
}

impl Attachment {
	pub fn runtime(&self) -> &'static Runtime {
		self.runtime
	}

	/// Looks a service up in the default gestalt. `None` after shutdown.
	pub fn find(&self, id: &str) -> Option<RecordView> {
		self.runtime.default_gestalt()?.find(id)
	}

	pub fn services(&self) -> Vec<RecordView> {
		self.runtime.default_gestalt().map(|g| g.services()).unwrap_or_default()
	}
}
