//! Capacity-bounded service repository with atomic publication.
//!
//! # Mental model
//!
//! * Readers pin an `Arc` of the current immutable map and resolve lookups against it.
//! * Writers take a short lock, build a replacement map from the latest one, and publish it.
//! * A record is published only once it is fully constructed, so `find` never sees a partial one.
//!
//! # Key types
//!
//! | Type | Meaning | Constraints |
//! |---|---|---|
//! | [`Repository`] | Bounded id-keyed store | `len() <= capacity()`; ids unique |
//! | [`RepoError`] | Rejection reason | Carries the offending id or the capacity |
//! | [`Rejected`] | Failed insert | Hands the record back so the caller can release it |
//!
//! # Invariants
//!
//! - Duplicate and capacity checks happen in the same critical section as the insert.
//!   - Enforced in: [`Repository::insert`]
//!   - Tested by: `invariants::test_last_slot_has_one_winner`
//!   - Failure symptom: two racing installs both succeed and the repository exceeds its capacity.
//! - Readers observe either the pre-mutation or the post-mutation map.
//!   - Enforced in: [`Repository::find`], [`Repository::records`]
//!   - Tested by: `invariants::test_readers_never_see_torn_state`
//!   - Failure symptom: a lookup sees more records than the capacity allows.
//! - Enumeration follows insertion order, and removal keeps the order of the rest.
//!   - Enforced in: [`Repository::remove`]
//!   - Tested by: `tests::records_keep_insertion_order`
//!
//! # Concurrency & ordering
//!
//! * Reads are wait-free (`ArcSwap` load).
//! * Writes are serialized by a `parking_lot` mutex; each write publishes one new map.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use thiserror::Error;

type Table<T> = IndexMap<Arc<str>, Arc<T>>;

/// Why a repository operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
	#[error("service `{0}` is already registered")]
	DuplicateId(String),

	#[error("repository is full (capacity {capacity})")]
	AtCapacity { capacity: usize },

	#[error("service `{0}` not found")]
	NotFound(String),
}

/// A refused insert, returning the record to the caller.
pub struct Rejected<T> {
	pub error: RepoError,
	pub record: T,
}

impl<T> Rejected<T> {
	pub fn into_inner(self) -> (RepoError, T) {
		(self.error, self.record)
	}
}

impl<T> fmt::Debug for Rejected<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Rejected").field("error", &self.error).finish_non_exhaustive()
	}
}

impl<T> fmt::Display for Rejected<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.error, f)
	}
}

impl<T> std::error::Error for Rejected<T> {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.error)
	}
}

/// Id-keyed store bounded by `capacity`.
pub struct Repository<T> {
	capacity: usize,
	snap: ArcSwap<Table<T>>,
	write: Mutex<()>,
}

impl<T> Repository<T> {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			snap: ArcSwap::from_pointee(IndexMap::new()),
			write: Mutex::new(()),
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn len(&self) -> usize {
		self.snap.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, id: &str) -> bool {
		self.snap.load().contains_key(id)
	}

	/// Non-binding pre-check of what [`insert`](Self::insert) would say right now.
	///
	/// Lets callers skip expensive work (such as loading a module) that would be rejected anyway.
	/// The answer may be stale by the time the insert runs.
	pub fn check(&self, id: &str) -> Result<(), RepoError> {
		Self::admit(&self.snap.load(), self.capacity, id)
	}

	fn admit(table: &Table<T>, capacity: usize, id: &str) -> Result<(), RepoError> {
		if table.contains_key(id) {
			return Err(RepoError::DuplicateId(id.to_string()));
		}
		if table.len() >= capacity {
			return Err(RepoError::AtCapacity { capacity });
		}
		Ok(())
	}

	/// Inserts `record` under `id` if the id is free and there is room.
	///
	/// # Errors
	///
	/// [`RepoError::DuplicateId`] or [`RepoError::AtCapacity`], with the record handed back.
	pub fn insert(&self, id: impl Into<Arc<str>>, record: T) -> Result<Arc<T>, Rejected<T>> {
		let id = id.into();
		let _guard = self.write.lock();
		let current = self.snap.load_full();
		if let Err(error) = Self::admit(&current, self.capacity, &id) {
			return Err(Rejected { error, record });
		}

		let record = Arc::new(record);
		let mut next = Table::clone(&current);
		next.insert(id, Arc::clone(&record));
		self.snap.store(Arc::new(next));
		Ok(record)
	}

	/// Wait-free lookup against the current snapshot.
	pub fn find(&self, id: &str) -> Option<Arc<T>> {
		self.snap.load().get(id).cloned()
	}

	/// Removes `id` and returns its record.
	///
	/// # Errors
	///
	/// [`RepoError::NotFound`] when no record has that id.
	pub fn remove(&self, id: &str) -> Result<Arc<T>, RepoError> {
		let _guard = self.write.lock();
		let current = self.snap.load_full();
		if !current.contains_key(id) {
			return Err(RepoError::NotFound(id.to_string()));
		}

		let mut next = Table::clone(&current);
		let record = next.shift_remove(id).ok_or_else(|| RepoError::NotFound(id.to_string()))?;
		self.snap.store(Arc::new(next));
		Ok(record)
	}

	/// Removes every record, returned in insertion order.
	pub fn drain_all(&self) -> Vec<Arc<T>> {
		let _guard = self.write.lock();
		let previous = self.snap.swap(Arc::new(IndexMap::new()));
		previous.values().cloned().collect()
	}

	/// Every record in insertion order, from one snapshot.
	pub fn records(&self) -> Vec<Arc<T>> {
		self.snap.load().values().cloned().collect()
	}

	/// Every id in insertion order, from one snapshot.
	pub fn ids(&self) -> Vec<Arc<str>> {
		self.snap.load().keys().cloned().collect()
	}
}

impl<T> fmt::Debug for Repository<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Repository")
			.field("capacity", &self.capacity)
			.field("ids", &self.ids())
			.finish()
	}
}

#[cfg(test)]
mod invariants;
