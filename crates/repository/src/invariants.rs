use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use super::*;

/// Must admit exactly one of several writers racing for the last slot.
///
/// * Enforced in: `Repository::insert`
/// * Failure symptom: the repository holds more records than its capacity.
#[cfg_attr(test, test)]
pub(crate) fn test_last_slot_has_one_winner() {
	for _ in 0..50 {
		let repo = Arc::new(Repository::new(1));
		let handles: Vec<_> = (0..8)
			.map(|i| {
				let repo = Arc::clone(&repo);
				thread::spawn(move || repo.insert(format!("svc{i}"), i).is_ok())
			})
			.collect();
		let winners = handles.into_iter().map(|h| h.join().unwrap()).filter(|won| *won).count();
		assert_eq!(winners, 1);
		assert_eq!(repo.len(), 1);
	}
}

/// Must never lose an update when distinct ids are inserted concurrently.
///
/// * Enforced in: `Repository::insert`
/// * Failure symptom: fewer records than successful inserts.
#[cfg_attr(test, test)]
pub(crate) fn test_no_lost_updates() {
	let repo = Arc::new(Repository::new(1024));
	let handles: Vec<_> = (0..8)
		.map(|t| {
			let repo = Arc::clone(&repo);
			thread::spawn(move || {
				for i in 0..64 {
					repo.insert(format!("t{t}-{i}"), ()).unwrap();
				}
			})
		})
		.collect();
	for h in handles {
		h.join().unwrap();
	}
	assert_eq!(repo.len(), 512);
}

/// Must show readers either the old or the new map, never an intermediate one.
///
/// * Enforced in: `Repository::find`, `Repository::records`
/// * Failure symptom: a reader sees a pair half inserted, or more records than capacity.
#[cfg_attr(test, test)]
pub(crate) fn test_readers_never_see_torn_state() {
	let repo = Arc::new(Repository::new(2));
	let stop = Arc::new(AtomicBool::new(false));

	let readers: Vec<_> = (0..4)
		.map(|_| {
			let repo = Arc::clone(&repo);
			let stop = Arc::clone(&stop);
			thread::spawn(move || {
				while !stop.load(Ordering::Relaxed) {
					let records = repo.records();
					assert!(records.len() <= 2);
					if let Some(r) = repo.find("steady") {
						assert_eq!(*r, 0);
					}
				}
			})
		})
		.collect();

	repo.insert("steady", 0).unwrap();
	for i in 1..2000 {
		repo.insert("churn", i).unwrap();
		assert!(repo.insert("overflow", i).is_err());
		repo.remove("churn").unwrap();
	}
	stop.store(true, Ordering::Relaxed);
	for r in readers {
		r.join().unwrap();
	}
	assert_eq!(repo.ids(), vec![Arc::<str>::from("steady")]);
}
