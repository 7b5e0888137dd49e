//! Whole-process lifecycle: before init, steady state, shutdown and afterwards. Runs as a single
//! test because shutdown is permanent for the process.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gestalt::{Loader, ModuleCatalog, Runtime, RuntimeConfig, RuntimeError, ServiceObject, TeardownError};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

struct Closing {
	finalized: Arc<AtomicBool>,
}

impl ServiceObject for Closing {
	fn fini(&self) {
		self.finalized.store(true, Ordering::SeqCst);
	}
}

#[test]
fn runtime_lifecycle_end_to_end() {
	assert!(matches!(Runtime::attach(), Err(RuntimeError::NotInitialized)));
	assert!(matches!(Runtime::global(), Err(RuntimeError::NotInitialized)));

	let finalized = Arc::new(AtomicBool::new(false));
	let catalog = ModuleCatalog::new();
	let flag = Arc::clone(&finalized);
	catalog.register("Service_Config_DLL", "_make_Service_Config_DLL", move || {
		Ok(Box::new(Closing { finalized: Arc::clone(&flag) }) as Box<dyn ServiceObject>)
	});
	let catalog = Arc::new(catalog);

	let dir = tempfile::tempdir().unwrap();
	std::fs::write(
		dir.path().join("svc.conf"),
		"dynamic Boot Service_Object * Service_Config_DLL:_make_Service_Config_DLL() \"\"\nremove Nothing\n",
	)
	.unwrap();
	let config_path = dir.path().join("gestalt.toml");
	std::fs::write(
		&config_path,
		"[repository]\ncapacity = 4\n\n[directives]\nfiles = [\"svc.conf\", \"absent.conf\"]\ninline = [\"suspend Boot\"]\n",
	)
	.unwrap();
	let config = RuntimeConfig::load(&config_path).unwrap();
	assert_eq!(config.directive_files()[0], dir.path().join("svc.conf"));

	let rt = Runtime::init_with_loader(config, Loader::new(catalog.clone())).unwrap();
	assert_eq!(rt.process_configured().unwrap(), 1);
	assert!(Runtime::attach().unwrap().find("Boot").is_some());

	// Singletons registered after init are torn down before the default gestalt.
	let order = Arc::new(Mutex::new(Vec::new()));
	for name in ["cache", "pool"] {
		let order = Arc::clone(&order);
		rt.at_exit(
			Arc::new(name),
			move |object, runtime: &'static Runtime| {
				let alive = runtime.default_gestalt().is_some_and(|g| g.find("Boot").is_some());
				order.lock().push(format!("{object} gestalt_alive={alive}"));
			},
			rt,
		)
		.unwrap();
	}
	let twice = Arc::new(7u8);
	rt.at_exit(Arc::clone(&twice), |_, ()| {}, ()).unwrap();
	assert!(matches!(rt.at_exit(twice, |_, ()| {}, ()), Err(TeardownError::DoubleRegistration(_))));

	assert_eq!(rt.shutdown().unwrap(), 4);
	assert_eq!(*order.lock(), ["pool gestalt_alive=true", "cache gestalt_alive=true"]);
	assert!(finalized.load(Ordering::SeqCst));
	assert!(!catalog.is_open("Service_Config_DLL"));

	assert!(rt.is_shut_down());
	assert!(rt.default_gestalt().is_none());
	assert!(matches!(Runtime::attach(), Err(RuntimeError::ShutDown)));
	assert_eq!(rt.process_directive("remove Boot\nresume Boot"), 2);
	assert!(matches!(rt.shutdown(), Err(RuntimeError::ShutDown)));
	assert_eq!(rt.at_exit(Arc::new(()), |_, ()| {}, ()), Err(TeardownError::Closed));
}
