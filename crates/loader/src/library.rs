//! Shared-library backend speaking the `gestalt-abi` entry-point protocol.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gestalt_abi::{GESTALT_SERVICE_ABI_V1, GestaltServiceEntryV1, GestaltServiceV1, GestaltStatus, GestaltStr};
use libloading::{Library, Symbol};

use crate::backend::{Module, ModuleBackend};
use crate::error::{LoadError, ServiceError};
use crate::service::{ServiceArgs, ServiceObject};

/// Platform file name for a bare module name.
pub fn library_file_name(name: &str) -> String {
	#[cfg(target_os = "macos")]
	{
		format!("lib{name}.dylib")
	}
	#[cfg(target_os = "windows")]
	{
		format!("{name}.dll")
	}
	#[cfg(not(any(target_os = "macos", target_os = "windows")))]
	{
		format!("lib{name}.so")
	}
}

/// Opens modules as shared libraries.
///
/// A module path containing a directory component (or an extension) is used as written. A bare
/// name is looked up in each search path, then in the working directory, first under its platform
/// file name ([`library_file_name`]) and then verbatim.
#[derive(Debug, Clone, Default)]
pub struct LibraryBackend {
	search_paths: Vec<PathBuf>,
}

impl LibraryBackend {
	pub fn new(search_paths: impl IntoIterator<Item = PathBuf>) -> Self {
		Self {
			search_paths: search_paths.into_iter().collect(),
		}
	}

	pub fn search_paths(&self) -> &[PathBuf] {
		&self.search_paths
	}

	fn candidates(&self, name: &str) -> Vec<PathBuf> {
		let path = Path::new(name);
		let bare = path.parent().is_none_or(|p| p.as_os_str().is_empty()) && path.extension().is_none();
		if !bare {
			return vec![path.to_path_buf()];
		}

		let file = library_file_name(name);
		self.search_paths
			.iter()
			.map(PathBuf::as_path)
			.chain(std::iter::once(Path::new(".")))
			.flat_map(|dir| [dir.join(&file), dir.join(name)])
			.collect()
	}
}

impl ModuleBackend for LibraryBackend {
	fn resolve(&self, path: &str) -> Result<String, LoadError> {
		let candidates = self.candidates(path);
		let found = candidates.iter().find(|c| c.is_file()).ok_or_else(|| LoadError::ModuleNotFound {
			path: path.to_string(),
			reason: format!("tried {}", candidates.iter().map(|c| c.display().to_string()).collect::<Vec<_>>().join(", ")),
		})?;
		let canonical = found.canonicalize().unwrap_or_else(|_| found.clone());
		Ok(canonical.to_string_lossy().into_owned())
	}

	fn open(&self, key: &str) -> Result<Arc<dyn Module>, LoadError> {
		// SAFETY: loading a library runs its initializers; modules are trusted code named by the
		// host's own configuration.
		let lib = unsafe { Library::new(key) }.map_err(|e| LoadError::ModuleNotFound {
			path: key.to_string(),
			reason: e.to_string(),
		})?;
		tracing::info!(module = %key, "module loaded");
		Ok(Arc::new(LibraryModule { key: key.to_string(), lib }))
	}
}

struct LibraryModule {
	key: String,
	lib: Library,
}

impl Module for LibraryModule {
	fn key(&self) -> &str {
		&self.key
	}

	fn make(&self, symbol: &str) -> Result<Box<dyn ServiceObject>, LoadError> {
		// SAFETY: the symbol is declared with the entry-point signature every module must export.
		let entry: Symbol<GestaltServiceEntryV1> = unsafe { self.lib.get(symbol.as_bytes()) }.map_err(|_| LoadError::SymbolNotFound {
			module: self.key.clone(),
			symbol: symbol.to_string(),
		})?;

		let mut vtable = GestaltServiceV1::empty();
		// SAFETY: `vtable` is a valid, writable `GestaltServiceV1` for the duration of the call.
		let status = unsafe { entry(&mut vtable) };
		if status != GestaltStatus::Ok {
			return Err(LoadError::rejected(symbol, format!("entry point returned {status:?}")));
		}
		if vtable.abi_version != GESTALT_SERVICE_ABI_V1 {
			if let Some(destroy) = vtable.destroy {
				// SAFETY: the entry succeeded, so `instance` is live and owned by `destroy`.
				unsafe { destroy(vtable.instance) };
			}
			return Err(LoadError::rejected(
				symbol,
				format!("ABI version {} (expected {GESTALT_SERVICE_ABI_V1})", vtable.abi_version),
			));
		}
		Ok(Box::new(CabiService { vtable }))
	}
}

impl Drop for LibraryModule {
	fn drop(&mut self) {
		tracing::info!(module = %self.key, "module unloaded");
	}
}

/// Service object backed by a module vtable.
struct CabiService {
	vtable: GestaltServiceV1,
}

// SAFETY: modules promise that every hook may be called from any thread; `instance` is owned by
// the module and only ever passed back to it.
unsafe impl Send for CabiService {}
unsafe impl Sync for CabiService {}

fn status_to_result(status: GestaltStatus, hook: &str) -> Result<(), ServiceError> {
	match status {
		GestaltStatus::Ok => Ok(()),
		other => Err(ServiceError::new(format!("{hook} returned {other:?}"))),
	}
}

impl ServiceObject for CabiService {
	fn init(&mut self, args: &ServiceArgs) -> Result<(), ServiceError> {
		let Some(init) = self.vtable.init else {
			return Ok(());
		};
		let argv: Vec<GestaltStr> = args.argv.iter().map(|a| GestaltStr::new(a)).collect();
		// SAFETY: `argv` and the strings it borrows outlive the call.
		let status = unsafe { init(self.vtable.instance, argv.len(), argv.as_ptr()) };
		status_to_result(status, "init")
	}

	fn fini(&self) {
		if let Some(fini) = self.vtable.fini {
			// SAFETY: `instance` came from the same vtable and has not been destroyed.
			unsafe { fini(self.vtable.instance) };
		}
	}

	fn suspend(&self) -> Result<(), ServiceError> {
		match self.vtable.suspend {
			// SAFETY: as for `fini`.
			Some(suspend) => status_to_result(unsafe { suspend(self.vtable.instance) }, "suspend"),
			None => Ok(()),
		}
	}

	fn resume(&self) -> Result<(), ServiceError> {
		match self.vtable.resume {
			// SAFETY: as for `fini`.
			Some(resume) => status_to_result(unsafe { resume(self.vtable.instance) }, "resume"),
			None => Ok(()),
		}
	}

	fn info(&self) -> String {
		let Some(info) = self.vtable.info else {
			return String::new();
		};
		let mut buf = vec![0u8; 128];
		loop {
			// SAFETY: `buf` is writable for `buf.len()` bytes.
			let len = unsafe { info(self.vtable.instance, buf.as_mut_ptr(), buf.len()) };
			if len <= buf.len() {
				buf.truncate(len);
				return String::from_utf8_lossy(&buf).into_owned();
			}
			buf.resize(len, 0);
		}
	}
}

impl Drop for CabiService {
	fn drop(&mut self) {
		if let Some(destroy) = self.vtable.destroy {
			// SAFETY: called once, after every other hook.
			unsafe { destroy(self.vtable.instance) };
		}
	}
}
