//! Dynamic service loader.
//!
//! Turns a module path plus entry symbol (or a static service name) into a live, initialized
//! [`ServiceHandle`].
//!
//! # Mental model
//!
//! * A module is opened once and shared. Every handle created from it holds a [`ModuleLease`],
//!   a counted reference; the module is physically released when the last lease goes.
//! * A handle owns its service object and its lease. The object is always finalized and dropped
//!   before the lease is released, so module code never runs after its module is gone.
//!
//! # Invariants
//!
//! - A failed load leaves no lease behind and no object alive.
//!   - Enforced in: [`Loader::load`]
//!   - Tested by: `tests/residency.rs`
//!   - Failure symptom: a module stays resident after every install from it failed.
//! - `fini` runs at most once per service.
//!   - Enforced in: [`ServiceHandle::finalize`]
//!   - Tested by: `tests::finalize_is_idempotent_and_runs_on_drop`
//! - Concurrent loads of one module open it once; concurrent releases unload it once.
//!   - Enforced in: `LoaderInner::acquire`, `LoaderInner::release`
//!   - Tested by: `tests/residency.rs`

mod backend;
mod error;
mod library;
mod service;
mod statics;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

pub use backend::{CatalogEntry, Module, ModuleBackend, ModuleCatalog};
pub use error::{LoadError, ServiceError};
pub use library::{LibraryBackend, library_file_name};
pub use service::{ServiceArgs, ServiceObject};
pub use statics::{StaticFactory, StaticServiceDef, StaticServiceReg, find_linked, linked_names};

#[doc(hidden)]
pub mod __private {
	pub use inventory;
}

struct Resident {
	module: Arc<dyn Module>,
	refs: usize,
}

struct LoaderInner {
	backend: Arc<dyn ModuleBackend>,
	resident: Mutex<HashMap<String, Resident>>,
	statics: RwLock<HashMap<String, StaticFactory>>,
}

impl LoaderInner {
	/// Opens `path` or bumps the count of the already-resident module.
	///
	/// The table lock is held across `open` so two first loads cannot both open the module.
	fn acquire(self: &Arc<Self>, path: &str) -> Result<ModuleLease, LoadError> {
		let key = self.backend.resolve(path)?;
		let mut resident = self.resident.lock();
		let module = match resident.get_mut(&key) {
			Some(entry) => {
				entry.refs += 1;
				Arc::clone(&entry.module)
			}
			None => {
				let module = self.backend.open(&key)?;
				resident.insert(key.clone(), Resident { module: Arc::clone(&module), refs: 1 });
				module
			}
		};
		Ok(ModuleLease {
			loader: Arc::clone(self),
			key,
			module,
		})
	}

	fn release(&self, key: &str) {
		let evicted = {
			let mut resident = self.resident.lock();
			match resident.get_mut(key) {
				Some(entry) if entry.refs > 1 => {
					entry.refs -= 1;
					None
				}
				Some(_) => resident.remove(key),
				None => {
					tracing::error!(module = %key, "released a module that is not resident");
					None
				}
			}
		};
		if evicted.is_some() {
			tracing::debug!(module = %key, "last lease released");
		}
	}
}

/// A counted reference to a resident module.
pub struct ModuleLease {
	loader: Arc<LoaderInner>,
	key: String,
	module: Arc<dyn Module>,
}

impl ModuleLease {
	/// Residency key of the leased module.
	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn module(&self) -> &dyn Module {
		&*self.module
	}
}

impl Drop for ModuleLease {
	fn drop(&mut self) {
		self.loader.release(&self.key);
	}
}

impl fmt::Debug for ModuleLease {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleLease").field("key", &self.key).finish_non_exhaustive()
	}
}

/// A live, initialized service.
///
/// Dropping the handle finalizes the service if that has not happened yet, drops the object and
/// then releases the module lease.
pub struct ServiceHandle {
	// Field order is drop order: the object must go before the lease.
	object: Box<dyn ServiceObject>,
	finalized: AtomicBool,
	lease: Option<ModuleLease>,
	origin: String,
}

impl ServiceHandle {
	fn new(origin: String, object: Box<dyn ServiceObject>, lease: Option<ModuleLease>) -> Self {
		Self {
			object,
			finalized: AtomicBool::new(false),
			lease,
			origin,
		}
	}

	pub fn object(&self) -> &dyn ServiceObject {
		&*self.object
	}

	/// `module:symbol` for dynamic services, the static name otherwise.
	pub fn origin(&self) -> &str {
		&self.origin
	}

	/// Residency key of the backing module, `None` for static services.
	pub fn module_key(&self) -> Option<&str> {
		self.lease.as_ref().map(ModuleLease::key)
	}

	/// Runs `fini` unless it already ran. Returns whether this call ran it.
	pub fn finalize(&self) -> bool {
		if self.finalized.swap(true, Ordering::AcqRel) {
			return false;
		}
		self.object.fini();
		true
	}

	pub fn is_finalized(&self) -> bool {
		self.finalized.load(Ordering::Acquire)
	}

	pub fn suspend(&self) -> Result<(), ServiceError> {
		self.object.suspend()
	}

	pub fn resume(&self) -> Result<(), ServiceError> {
		self.object.resume()
	}

	pub fn info(&self) -> String {
		self.object.info()
	}
}

impl Drop for ServiceHandle {
	fn drop(&mut self) {
		self.finalize();
	}
}

impl fmt::Debug for ServiceHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceHandle")
			.field("origin", &self.origin)
			.field("module", &self.module_key())
			.field("finalized", &self.is_finalized())
			.finish()
	}
}

/// Loads services and tracks which modules are resident.
///
/// Cloning is cheap and clones share residency and static registrations.
#[derive(Clone)]
pub struct Loader {
	inner: Arc<LoaderInner>,
}

impl Loader {
	pub fn new(backend: Arc<dyn ModuleBackend>) -> Self {
		Self {
			inner: Arc::new(LoaderInner {
				backend,
				resident: Mutex::new(HashMap::new()),
				statics: RwLock::new(HashMap::new()),
			}),
		}
	}

	/// Loader over shared libraries found in `search_paths`.
	pub fn with_search_paths(search_paths: impl IntoIterator<Item = std::path::PathBuf>) -> Self {
		Self::new(Arc::new(LibraryBackend::new(search_paths)))
	}

	/// Loads `module_path`, creates a service through `entry_symbol` and initializes it with
	/// `params`.
	///
	/// # Errors
	///
	/// [`LoadError::ModuleNotFound`], [`LoadError::SymbolNotFound`] or
	/// [`LoadError::InitRejected`]. On error nothing stays resident on this call's behalf.
	pub fn load(&self, module_path: &str, entry_symbol: &str, params: &str) -> Result<ServiceHandle, LoadError> {
		let lease = self.inner.acquire(module_path)?;
		let mut object = lease.module().make(entry_symbol)?;
		object
			.init(&ServiceArgs::parse(params))
			.map_err(|e| LoadError::rejected(entry_symbol, e))?;

		tracing::debug!(module = %lease.key(), symbol = %entry_symbol, "service loaded");
		Ok(ServiceHandle::new(format!("{module_path}:{entry_symbol}"), object, Some(lease)))
	}

	/// Creates and initializes the static service `name`.
	///
	/// # Errors
	///
	/// [`LoadError::ModuleNotFound`] when no static service has that name, or
	/// [`LoadError::InitRejected`].
	pub fn load_static(&self, name: &str, params: &str) -> Result<ServiceHandle, LoadError> {
		let runtime = self.inner.statics.read().get(name).cloned();
		let mut object = match (runtime, find_linked(name)) {
			(Some(factory), _) => factory(),
			(None, Some(def)) => (def.make)(),
			(None, None) => {
				return Err(LoadError::ModuleNotFound {
					path: name.to_string(),
					reason: "no static service with this name".into(),
				});
			}
		};
		object.init(&ServiceArgs::parse(params)).map_err(|e| LoadError::rejected(name, e))?;

		tracing::debug!(name = %name, "static service loaded");
		Ok(ServiceHandle::new(name.to_string(), object, None))
	}

	/// Adds a static service at run time, shadowing any link-time one of the same name.
	pub fn register_static<F>(&self, name: impl Into<String>, factory: F)
	where
		F: Fn() -> Box<dyn ServiceObject> + Send + Sync + 'static,
	{
		self.inner.statics.write().insert(name.into(), Arc::new(factory));
	}

	/// Finalizes the service, drops it and releases its module lease.
	pub fn unload(&self, handle: ServiceHandle) {
		handle.finalize();
		drop(handle);
	}

	/// Number of distinct resident modules.
	pub fn resident_count(&self) -> usize {
		self.inner.resident.lock().len()
	}

	/// Live lease count for `module_path`, or `None` when it is not resident.
	pub fn refs(&self, module_path: &str) -> Option<usize> {
		let key = self.inner.backend.resolve(module_path).ok()?;
		self.inner.resident.lock().get(&key).map(|r| r.refs)
	}
}

impl Default for Loader {
	fn default() -> Self {
		Self::with_search_paths(Vec::new())
	}
}

impl fmt::Debug for Loader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Loader").field("resident", &self.resident_count()).finish_non_exhaustive()
	}
}
