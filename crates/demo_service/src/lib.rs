//! Example service module.
//!
//! Build as a `cdylib` and install it with
//!
//! ```text
//! dynamic Demo Service_Object * gestalt_demo_service:_make_Service_Config_DLL() "Demo -v"
//! ```
//!
//! `_make_Refuses_Init` builds a service whose `init` always fails, and `_make_Future_Abi` one
//! that reports an ABI version the host does not speak. Both exercise the host's cleanup of
//! refused installs.

#![allow(non_snake_case, reason = "entry symbols are named after the services they make")]

use core::ffi::c_void;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use gestalt_abi::{GESTALT_SERVICE_ABI_V1, GestaltServiceV1, GestaltStatus, GestaltStr};

struct DemoService {
	label: String,
	args: Vec<String>,
	suspended: AtomicBool,
	refuse_init: bool,
	finis: AtomicU32,
}

impl DemoService {
	fn new(refuse_init: bool) -> Self {
		Self {
			label: String::from("demo"),
			args: Vec::new(),
			suspended: AtomicBool::new(false),
			refuse_init,
			finis: AtomicU32::new(0),
		}
	}

	fn describe(&self) -> String {
		let state = if self.suspended.load(Ordering::Acquire) { "suspended" } else { "active" };
		format!("{} [{}] args={}", self.label, state, self.args.join(" "))
	}
}

fn fill(out: *mut GestaltServiceV1, service: DemoService) -> GestaltStatus {
	fill_versioned(out, service, GESTALT_SERVICE_ABI_V1)
}

fn fill_versioned(out: *mut GestaltServiceV1, service: DemoService, abi_version: u32) -> GestaltStatus {
	if out.is_null() {
		return GestaltStatus::Failed;
	}
	let instance = Box::into_raw(Box::new(service)).cast::<c_void>();
	unsafe {
		*out = GestaltServiceV1 {
			abi_version,
			instance,
			init: Some(demo_init),
			fini: Some(demo_fini),
			suspend: Some(demo_suspend),
			resume: Some(demo_resume),
			info: Some(demo_info),
			destroy: Some(demo_destroy),
		};
	}
	GestaltStatus::Ok
}

#[unsafe(no_mangle)]
/// # Safety
/// `out` must be null or valid for one write of a [`GestaltServiceV1`].
pub unsafe extern "C" fn _make_Service_Config_DLL(out: *mut GestaltServiceV1) -> GestaltStatus {
	fill(out, DemoService::new(false))
}

#[unsafe(no_mangle)]
/// # Safety
/// `out` must be null or valid for one write of a [`GestaltServiceV1`].
pub unsafe extern "C" fn _make_Refuses_Init(out: *mut GestaltServiceV1) -> GestaltStatus {
	fill(out, DemoService::new(true))
}

#[unsafe(no_mangle)]
/// # Safety
/// `out` must be null or valid for one write of a [`GestaltServiceV1`].
pub unsafe extern "C" fn _make_Future_Abi(out: *mut GestaltServiceV1) -> GestaltStatus {
	fill_versioned(out, DemoService::new(false), GESTALT_SERVICE_ABI_V1 + 1)
}

// SAFETY (all hooks): `instance` is the pointer produced by `fill` and stays valid until
// `demo_destroy`. The host serializes `init` against every other hook.

unsafe fn service<'a>(instance: *mut c_void) -> Option<&'a DemoService> {
	unsafe { instance.cast::<DemoService>().as_ref() }
}

unsafe extern "C" fn demo_init(instance: *mut c_void, argc: usize, argv: *const GestaltStr) -> GestaltStatus {
	let Some(service) = (unsafe { instance.cast::<DemoService>().as_mut() }) else {
		return GestaltStatus::Failed;
	};
	if service.refuse_init {
		return GestaltStatus::Rejected;
	}
	if argc > 0 && argv.is_null() {
		return GestaltStatus::Failed;
	}

	let mut args = Vec::with_capacity(argc);
	for i in 0..argc {
		match unsafe { (*argv.add(i)).as_str() } {
			Some(arg) => args.push(arg.to_string()),
			None => return GestaltStatus::Rejected,
		}
	}
	if let Some(label) = args.first() {
		service.label = label.clone();
	}
	service.args = args;
	GestaltStatus::Ok
}

unsafe extern "C" fn demo_fini(instance: *mut c_void) {
	if let Some(service) = unsafe { service(instance) } {
		service.finis.fetch_add(1, Ordering::AcqRel);
	}
}

unsafe extern "C" fn demo_suspend(instance: *mut c_void) -> GestaltStatus {
	match unsafe { service(instance) } {
		Some(service) => {
			service.suspended.store(true, Ordering::Release);
			GestaltStatus::Ok
		}
		None => GestaltStatus::Failed,
	}
}

unsafe extern "C" fn demo_resume(instance: *mut c_void) -> GestaltStatus {
	match unsafe { service(instance) } {
		Some(service) => {
			service.suspended.store(false, Ordering::Release);
			GestaltStatus::Ok
		}
		None => GestaltStatus::Failed,
	}
}

unsafe extern "C" fn demo_info(instance: *mut c_void, buf: *mut u8, cap: usize) -> usize {
	let Some(service) = (unsafe { service(instance) }) else {
		return 0;
	};
	let text = service.describe();
	if !buf.is_null() {
		let n = text.len().min(cap);
		unsafe { core::ptr::copy_nonoverlapping(text.as_ptr(), buf, n) };
	}
	text.len()
}

unsafe extern "C" fn demo_destroy(instance: *mut c_void) {
	if !instance.is_null() {
		drop(unsafe { Box::from_raw(instance.cast::<DemoService>()) });
	}
}
