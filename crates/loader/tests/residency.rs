use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use gestalt_loader::{LoadError, Loader, ModuleCatalog, ServiceArgs, ServiceError, ServiceObject};

#[derive(Default)]
struct Echo {
	args: Vec<String>,
}

impl ServiceObject for Echo {
	fn init(&mut self, args: &ServiceArgs) -> Result<(), ServiceError> {
		if args.argv.first().is_some_and(|a| a == "--refuse") {
			return Err("refused by request".into());
		}
		self.args = args.argv.clone();
		Ok(())
	}

	fn info(&self) -> String {
		self.args.join(" ")
	}
}

#[derive(Default)]
struct Droppy {
	drops: Arc<AtomicUsize>,
}

impl ServiceObject for Droppy {}

impl Drop for Droppy {
	fn drop(&mut self) {
		self.drops.fetch_add(1, Ordering::SeqCst);
	}
}

gestalt_loader::static_service!("Linked_Echo", || Box::new(Echo::default()));

fn catalog() -> Arc<ModuleCatalog> {
	let catalog = ModuleCatalog::new();
	catalog
		.register("Service_Config_DLL", "_make_Echo", || Ok(Box::new(Echo::default())))
		.register("Service_Config_DLL", "_make_Broken", || Err(ServiceError::new("entry failed")));
	Arc::new(catalog)
}

#[test]
fn module_is_opened_once_and_released_with_last_service() {
	let catalog = catalog();
	let loader = Loader::new(catalog.clone());

	let a = loader.load("Service_Config_DLL", "_make_Echo", "a").unwrap();
	let b = loader.load("Service_Config_DLL", "_make_Echo", "b").unwrap();
	assert_eq!(catalog.opened("Service_Config_DLL"), 1);
	assert_eq!(loader.refs("Service_Config_DLL"), Some(2));
	assert_eq!(a.info(), "a");

	loader.unload(a);
	assert_eq!(loader.refs("Service_Config_DLL"), Some(1));
	assert!(catalog.is_open("Service_Config_DLL"));

	drop(b);
	assert_eq!(loader.refs("Service_Config_DLL"), None);
	assert!(!catalog.is_open("Service_Config_DLL"));
	assert_eq!(loader.resident_count(), 0);
}

#[test]
fn every_failure_stage_leaves_nothing_resident() {
	let catalog = catalog();
	let loader = Loader::new(catalog.clone());

	let err = loader.load("No_Such_DLL", "_make_Echo", "").unwrap_err();
	assert!(matches!(err, LoadError::ModuleNotFound { .. }));

	let err = loader.load("Service_Config_DLL", "_make_Missing", "").unwrap_err();
	assert_eq!(
		err,
		LoadError::SymbolNotFound {
			module: "Service_Config_DLL".into(),
			symbol: "_make_Missing".into()
		}
	);

	let err = loader.load("Service_Config_DLL", "_make_Broken", "").unwrap_err();
	assert!(matches!(err, LoadError::InitRejected { .. }));

	let err = loader.load("Service_Config_DLL", "_make_Echo", "--refuse").unwrap_err();
	assert!(matches!(err, LoadError::InitRejected { ref reason, .. } if reason == "refused by request"));

	assert_eq!(loader.resident_count(), 0);
	assert!(!catalog.is_open("Service_Config_DLL"));
}

#[test]
fn object_is_dropped_before_module_is_released() {
	let drops = Arc::new(AtomicUsize::new(0));
	let catalog = catalog();
	let counter = Arc::clone(&drops);
	catalog.register("Service_Config_DLL", "_make_Droppy", move || Ok(Box::new(Droppy { drops: Arc::clone(&counter) })));
	let loader = Loader::new(catalog.clone());

	let handle = loader.load("Service_Config_DLL", "_make_Droppy", "").unwrap();
	assert_eq!(handle.module_key(), Some("Service_Config_DLL"));
	loader.unload(handle);

	assert_eq!(drops.load(Ordering::SeqCst), 1);
	assert!(!catalog.is_open("Service_Config_DLL"));
}

#[test]
fn concurrent_loads_share_one_open() {
	let catalog = catalog();
	let loader = Loader::new(catalog.clone());
	let barrier = Arc::new(Barrier::new(8));

	let handles: Vec<_> = (0..8)
		.map(|_| {
			let loader = loader.clone();
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				loader.load("Service_Config_DLL", "_make_Echo", "").unwrap()
			})
		})
		.collect();
	let services: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

	assert_eq!(catalog.opened("Service_Config_DLL"), 1);
	assert_eq!(loader.refs("Service_Config_DLL"), Some(8));

	let releasers: Vec<_> = services
		.into_iter()
		.map(|svc| {
			let loader = loader.clone();
			thread::spawn(move || loader.unload(svc))
		})
		.collect();
	for r in releasers {
		r.join().unwrap();
	}
	assert_eq!(loader.resident_count(), 0);
	assert!(!catalog.is_open("Service_Config_DLL"));
}

#[test]
fn linked_static_services_are_found() {
	assert!(gestalt_loader::linked_names().contains(&"Linked_Echo"));

	let loader = Loader::new(catalog());
	let handle = loader.load_static("Linked_Echo", r#"-n "two words""#).unwrap();
	assert_eq!(handle.info(), "-n two words");
	assert_eq!(handle.module_key(), None);
}

#[test]
fn runtime_static_registration_shadows_linked_one() {
	let loader = Loader::new(catalog());
	loader.register_static("Linked_Echo", || Box::new(Droppy::default()));
	let handle = loader.load_static("Linked_Echo", "ignored").unwrap();
	assert_eq!(handle.info(), "");
}
