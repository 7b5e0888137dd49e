//! Module backends: where modules come from and how entry symbols become service objects.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::{LoadError, ServiceError};
use crate::service::ServiceObject;

/// An opened module. Dropping the last reference unloads it.
pub trait Module: Send + Sync {
	/// Residency key this module was opened under.
	fn key(&self) -> &str;

	/// Resolves `symbol` and invokes it to produce a fresh, uninitialized service object.
	fn make(&self, symbol: &str) -> Result<Box<dyn ServiceObject>, LoadError>;
}

/// Opens modules by name.
pub trait ModuleBackend: Send + Sync {
	/// Maps a directive module path to the key modules are kept resident under.
	///
	/// Two paths naming the same module must resolve to the same key.
	fn resolve(&self, path: &str) -> Result<String, LoadError>;

	/// Physically opens the module for a key returned by [`resolve`](Self::resolve).
	fn open(&self, key: &str) -> Result<Arc<dyn Module>, LoadError>;
}

/// Entry point of a catalog module.
pub type CatalogEntry = Arc<dyn Fn() -> Result<Box<dyn ServiceObject>, ServiceError> + Send + Sync>;

#[derive(Default)]
struct CatalogSlot {
	symbols: RwLock<HashMap<String, CatalogEntry>>,
	opened: AtomicUsize,
	closed: AtomicUsize,
}

/// In-process backend whose modules are named sets of Rust entry points.
///
/// Used to embed services in the host binary and in tests, where open and close counts are
/// observable through [`ModuleCatalog::opened`] and [`ModuleCatalog::is_open`].
#[derive(Default)]
pub struct ModuleCatalog {
	modules: RwLock<HashMap<String, Arc<CatalogSlot>>>,
}

impl ModuleCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds (or replaces) `symbol` in `module`, creating the module on first use.
	pub fn register<F>(&self, module: &str, symbol: &str, entry: F) -> &Self
	where
		F: Fn() -> Result<Box<dyn ServiceObject>, ServiceError> + Send + Sync + 'static,
	{
		let slot = Arc::clone(self.modules.write().entry(module.to_string()).or_default());
		slot.symbols.write().insert(symbol.to_string(), Arc::new(entry));
		self
	}

	/// Number of times `module` has been physically opened.
	pub fn opened(&self, module: &str) -> usize {
		self.slot(module).map_or(0, |s| s.opened.load(Ordering::SeqCst))
	}

	/// Whether `module` is currently open.
	pub fn is_open(&self, module: &str) -> bool {
		self.slot(module)
			.is_some_and(|s| s.opened.load(Ordering::SeqCst) > s.closed.load(Ordering::SeqCst))
	}

	fn slot(&self, module: &str) -> Option<Arc<CatalogSlot>> {
		self.modules.read().get(module).cloned()
	}
}

impl ModuleBackend for ModuleCatalog {
	fn resolve(&self, path: &str) -> Result<String, LoadError> {
		if self.modules.read().contains_key(path) {
			Ok(path.to_string())
		} else {
			Err(LoadError::ModuleNotFound {
				path: path.to_string(),
				reason: "no such module in catalog".into(),
			})
		}
	}

	fn open(&self, key: &str) -> Result<Arc<dyn Module>, LoadError> {
		let slot = self.slot(key).ok_or_else(|| LoadError::ModuleNotFound {
			path: key.to_string(),
			reason: "no such module in catalog".into(),
		})?;
		slot.opened.fetch_add(1, Ordering::SeqCst);
		Ok(Arc::new(CatalogModule { key: key.to_string(), slot }))
	}
}

struct CatalogModule {
	key: String,
	slot: Arc<CatalogSlot>,
}

impl Module for CatalogModule {
	fn key(&self) -> &str {
		&self.key
	}

	fn make(&self, symbol: &str) -> Result<Box<dyn ServiceObject>, LoadError> {
		let entry = self
			.slot
			.symbols
			.read()
			.get(symbol)
			.cloned()
			.ok_or_else(|| LoadError::SymbolNotFound {
				module: self.key.clone(),
				symbol: symbol.to_string(),
			})?;
		entry().map_err(|e| LoadError::rejected(symbol, e))
	}
}

impl Drop for CatalogModule {
	fn drop(&mut self) {
		self.slot.closed.fetch_add(1, Ordering::SeqCst);
	}
}
