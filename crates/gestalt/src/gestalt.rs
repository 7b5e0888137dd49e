//! Isolated configuration universes.
//!
//! # Mental model
//!
//! * A gestalt owns one bounded [`Repository`] of [`ServiceRecord`]s and shares a [`Loader`].
//! * Mutations (installs, removals, suspends, resumes, close) are serialized by a per-gestalt
//!   lock; a whole submission holds it, so two submissions never interleave.
//! * Lookups go straight to the repository snapshot and never take the lock.
//!
//! # Invariants
//!
//! - Two gestalts never share records, even when they share a loader.
//!   - Tested by: `tests/gestalt.rs`
//! - Installs racing for the last slot have exactly one winner, and losers leave no module
//!   resident.
//!   - Enforced in: `Gestalt::install` (pre-check and insert under the mutation lock)
//!   - Tested by: `tests/gestalt.rs`
//!   - Failure symptom: a module stays resident after a rejected install.
//! - `close` finalizes every record exactly once, newest first.
//!   - Enforced in: [`Gestalt::close`]
//!   - Tested by: `tests/gestalt.rs`

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use gestalt_directive::{Action, Descriptor};
use gestalt_loader::Loader;
use gestalt_repository::{RepoError, Repository};
use parking_lot::{Mutex, MutexGuard};

use crate::error::{ConfigError, DirectiveError};
use crate::processor;
use crate::record::{RecordView, ServiceRecord, ServiceState};

/// An isolated configuration universe with its own capacity limit.
pub struct Gestalt {
	repository: Repository<ServiceRecord>,
	loader: Loader,
	mutation: Mutex<()>,
	closed: AtomicBool,
}

impl Gestalt {
	/// Gestalt loading shared libraries from the working directory only.
	pub fn new(capacity: usize) -> Self {
		Self::with_loader(capacity, Loader::default())
	}

	pub fn with_loader(capacity: usize, loader: Loader) -> Self {
		Self {
			repository: Repository::new(capacity),
			loader,
			mutation: Mutex::new(()),
			closed: AtomicBool::new(false),
		}
	}

	pub fn capacity(&self) -> usize {
		self.repository.capacity()
	}

	pub fn len(&self) -> usize {
		self.repository.len()
	}

	pub fn is_empty(&self) -> bool {
		self.repository.is_empty()
	}

	pub fn loader(&self) -> &Loader {
		&self.loader
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}

	/// Processes every directive in `text` and returns how many failed.
	pub fn process_directive(&self, text: &str) -> usize {
		processor::process(self, text)
	}

	/// Processes a directive file.
	///
	/// # Errors
	///
	/// Only when the file cannot be read; directive failures are counted in the result.
	pub fn process_file(&self, path: &Path) -> Result<usize, ConfigError> {
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		tracing::debug!(path = %path.display(), "processing directive file");
		Ok(self.process_directive(&text))
	}

	/// Applies one already-parsed directive.
	pub fn process_descriptor(&self, descriptor: &Descriptor) -> Result<(), DirectiveError> {
		let _guard = self.lock_mutations();
		self.apply(descriptor)
	}

	/// Looks up an installed service. Never blocks on mutations.
	pub fn find(&self, id: &str) -> Option<RecordView> {
		self.repository.find(id).map(RecordView)
	}

	/// Every installed service in installation order.
	pub fn services(&self) -> Vec<RecordView> {
		self.repository.records().into_iter().map(RecordView).collect()
	}

	pub fn remove(&self, id: &str) -> Result<(), DirectiveError> {
		self.process_descriptor(&Descriptor::remove(id))
	}

	pub fn suspend(&self, id: &str) -> Result<(), DirectiveError> {
		self.process_descriptor(&Descriptor::suspend(id))
	}

	pub fn resume(&self, id: &str) -> Result<(), DirectiveError> {
		self.process_descriptor(&Descriptor::resume(id))
	}

	/// Removes and finalizes every service, newest first. Later directives fail with
	/// [`DirectiveError::Closed`]. Idempotent.
	pub fn close(&self) {
		let _guard = self.lock_mutations();
		if self.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		let records = self.repository.drain_all();
		let count = records.len();
		for record in records.into_iter().rev() {
			record.retire();
			tracing::debug!(id = %record.id(), "service finalized at close");
		}
		tracing::debug!(services = count, "gestalt closed");
	}

	pub(crate) fn lock_mutations(&self) -> MutexGuard<'_, ()> {
		self.mutation.lock()
	}

	/// Applies `descriptor`. The caller holds the mutation lock.
	pub(crate) fn apply(&self, descriptor: &Descriptor) -> Result<(), DirectiveError> {
		if self.is_closed() {
			return Err(DirectiveError::Closed);
		}
		match descriptor.action {
			Action::Install => self.install(descriptor),
			Action::Remove => {
				let record = self.repository.remove(&descriptor.id)?;
				record.retire();
				tracing::info!(id = %descriptor.id, "service removed");
				Ok(())
			}
			Action::Suspend => self.transition(&descriptor.id, ServiceState::Suspended),
			Action::Resume => self.transition(&descriptor.id, ServiceState::Active),
		}
	}

	fn install(&self, descriptor: &Descriptor) -> Result<(), DirectiveError> {
		let id = &descriptor.id;
		self.repository.check(id)?;

		let loaded = match (&descriptor.module_path, &descriptor.entry_symbol) {
			(Some(path), Some(symbol)) => self.loader.load(path, symbol, &descriptor.params),
			_ => self.loader.load_static(id, &descriptor.params),
		};
		let handle = loaded.map_err(|source| DirectiveError::Load { id: id.clone(), source })?;

		let record = match self.repository.insert(id.as_str(), ServiceRecord::new(id.clone(), descriptor.service_type, handle)) {
			Ok(record) => record,
			// Not reached while `check` and `insert` run under the same mutation lock. The record
			// is still finalized here, before its module lease is released.
			Err(rejected) => {
				let (error, record) = rejected.into_inner();
				record.retire();
				return Err(error.into());
			}
		};
		tracing::info!(id = %id, origin = %record.handle().origin(), "service installed");

		if !descriptor.active {
			self.transition(id, ServiceState::Suspended)?;
		}
		Ok(())
	}

	fn transition(&self, id: &str, target: ServiceState) -> Result<(), DirectiveError> {
		let record = self
			.repository
			.find(id)
			.ok_or_else(|| RepoError::NotFound(id.to_string()))?;
		if record.state() == target {
			return Ok(());
		}

		let handle = record.handle();
		let outcome = match target {
			ServiceState::Suspended => handle.suspend(),
			_ => handle.resume(),
		};
		outcome.map_err(|source| DirectiveError::Service { id: id.to_string(), source })?;
		record.set_state(target);
		tracing::info!(id = %id, state = ?target, "service state changed");
		Ok(())
	}
}

impl Drop for Gestalt {
	fn drop(&mut self) {
		self.close();
	}
}

impl std::fmt::Debug for Gestalt {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Gestalt")
			.field("capacity", &self.capacity())
			.field("services", &self.repository.ids())
			.field("closed", &self.is_closed())
			.finish()
	}
}
