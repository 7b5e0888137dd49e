//! A thread racing `Runtime::init` never attaches to a runtime without its default gestalt.

use std::sync::{Arc, Barrier};
use std::thread;

use gestalt::{Loader, ModuleCatalog, Runtime, RuntimeConfig};

#[test]
fn attach_during_init_sees_the_default_gestalt() {
	let barrier = Arc::new(Barrier::new(5));
	let watchers: Vec<_> = (0..4)
		.map(|_| {
			let barrier = Arc::clone(&barrier);
			thread::spawn(move || {
				barrier.wait();
				loop {
					if let Ok(attachment) = Runtime::attach() {
						return attachment.runtime().default_gestalt().is_some();
					}
					thread::yield_now();
				}
			})
		})
		.collect();

	barrier.wait();
	Runtime::init_with_loader(RuntimeConfig::default(), Loader::new(Arc::new(ModuleCatalog::new()))).unwrap();

	for watcher in watchers {
		assert!(watcher.join().unwrap());
	}
}
