//! C ABI for dynamically loaded service modules.
//!
//! A module exports one or more entry symbols of type [`GestaltServiceEntryV1`]. The host calls an
//! entry with a pointer to an uninitialized [`GestaltServiceV1`]; the entry fills in the vtable and
//! returns [`GestaltStatus::Ok`]. Every other interaction goes through the vtable:
//!
//! 1. `init` with the parsed parameter vector. Anything but `Ok` means the service refused to start.
//! 2. `suspend` / `resume` / `info` while the service is installed.
//! 3. `fini` exactly once when the service is removed, then `destroy` to free `instance`.
//!
//! `destroy` is always called, including after a refused `init`.

use core::ffi::c_void;

/// Current ABI version. Modules must echo it in [`GestaltServiceV1::abi_version`].
pub const GESTALT_SERVICE_ABI_V1: u32 = 1;

/// Status codes crossing the module boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestaltStatus {
	Ok = 0,
	/// The service declined the request (bad parameters, refused init).
	Rejected = 1,
	/// ABI mismatch between host and module.
	Incompatible = 2,
	/// Any other failure.
	Failed = 3,
}

/// Borrowed UTF-8 string slice.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GestaltStr {
	pub ptr: *const u8,
	pub len: usize,
}

impl GestaltStr {
	/// Borrows `s` for the duration of one call.
	pub fn new(s: &str) -> Self {
		Self { ptr: s.as_ptr(), len: s.len() }
	}

	/// Reads the slice back as `&str`.
	///
	/// # Safety
	///
	/// `ptr` must point to `len` readable bytes that stay alive for `'a`.
	pub unsafe fn as_str<'a>(&self) -> Option<&'a str> {
		if self.ptr.is_null() {
			return (self.len == 0).then_some("");
		}
		let bytes = unsafe { core::slice::from_raw_parts(self.ptr, self.len) };
		core::str::from_utf8(bytes).ok()
	}
}

/// Initializes the service with `argc` arguments.
pub type GestaltInitFn = unsafe extern "C" fn(instance: *mut c_void, argc: usize, argv: *const GestaltStr) -> GestaltStatus;
/// Plain lifecycle hook (`fini`, `destroy`).
pub type GestaltHookFn = unsafe extern "C" fn(instance: *mut c_void);
/// Lifecycle hook that may fail (`suspend`, `resume`).
pub type GestaltControlFn = unsafe extern "C" fn(instance: *mut c_void) -> GestaltStatus;
/// Writes at most `cap` bytes of UTF-8 into `buf` and returns the full length of the description.
pub type GestaltInfoFn = unsafe extern "C" fn(instance: *mut c_void, buf: *mut u8, cap: usize) -> usize;

/// Service vtable filled in by a module entry point.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GestaltServiceV1 {
	pub abi_version: u32,
	/// Opaque module-owned state passed back to every hook.
	pub instance: *mut c_void,
	pub init: Option<GestaltInitFn>,
	pub fini: Option<GestaltHookFn>,
	pub suspend: Option<GestaltControlFn>,
	pub resume: Option<GestaltControlFn>,
	pub info: Option<GestaltInfoFn>,
	pub destroy: Option<GestaltHookFn>,
}

impl GestaltServiceV1 {
	/// A vtable with no hooks and a null instance.
	pub const fn empty() -> Self {
		Self {
			abi_version: 0,
			instance: core::ptr::null_mut(),
			init: None,
			fini: None,
			suspend: None,
			resume: None,
			info: None,
			destroy: None,
		}
	}
}

impl Default for GestaltServiceV1 {
	fn default() -> Self {
		Self::empty()
	}
}

/// Signature of a module entry symbol.
pub type GestaltServiceEntryV1 = unsafe extern "C" fn(out: *mut GestaltServiceV1) -> GestaltStatus;
