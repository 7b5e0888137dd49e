//! Process-lifetime teardown registry.
//!
//! Long-lived singletons register their cleanup here instead of relying on static destructors.
//! One pass, run at controlled shutdown, destroys them newest first.
//!
//! # Invariants
//!
//! - Cleanups run exactly once, in strict reverse registration order.
//!   - Enforced in: [`TeardownRegistry::run`]
//!   - Tested by: `tests/teardown.rs`
//! - An object is registered at most once.
//!   - Enforced in: [`TeardownRegistry::register`]
//!   - Failure symptom: the object is destroyed twice.
//! - A panicking cleanup does not stop the pass.
//!   - Enforced in: [`TeardownRegistry::run`]

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Position of a registration in the teardown order. Later ids are torn down first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for RegistrationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeardownError {
	/// The object already has a registration; registering again would destroy it twice.
	#[error("object is already registered for teardown as {0}")]
	DoubleRegistration(RegistrationId),

	#[error("teardown has already run")]
	Closed,
}

struct Entry {
	id: RegistrationId,
	object: usize,
	label: &'static str,
	cleanup: Box<dyn FnOnce() + Send>,
}

#[derive(Default)]
struct State {
	entries: Vec<Entry>,
	next: u64,
	closed: bool,
}

/// Ordered list of owned objects and their cleanups.
#[derive(Default)]
pub struct TeardownRegistry {
	state: Mutex<State>,
}

impl TeardownRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Takes ownership of `object` until the teardown pass, which calls `cleanup(object, context)`.
	///
	/// # Errors
	///
	/// [`TeardownError::DoubleRegistration`] if this same allocation is already registered, and
	/// [`TeardownError::Closed`] once the pass has run. The object is dropped on error.
	#[must_use = "a failed teardown registration means the object is never cleaned up"]
	pub fn register<T, C, F>(&self, object: Arc<T>, cleanup: F, context: C) -> Result<RegistrationId, TeardownError>
	where
		T: Send + Sync + 'static,
		C: Send + 'static,
		F: FnOnce(Arc<T>, C) + Send + 'static,
	{
		let address = Arc::as_ptr(&object) as usize;
		let mut state = self.state.lock();
		if state.closed {
			return Err(TeardownError::Closed);
		}
		if let Some(existing) = state.entries.iter().find(|e| e.object == address) {
			tracing::error!(existing = %existing.id, object = existing.label, "double teardown registration");
			return Err(TeardownError::DoubleRegistration(existing.id));
		}

		let id = RegistrationId(state.next);
		state.next += 1;
		state.entries.push(Entry {
			id,
			object: address,
			label: std::any::type_name::<T>(),
			cleanup: Box::new(move || cleanup(object, context)),
		});
		Ok(id)
	}

	/// Live registrations.
	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	/// Runs every cleanup newest first and closes the registry. Returns how many ran.
	///
	/// Cleanups run without the registry lock held; a cleanup that registers again gets
	/// [`TeardownError::Closed`]. Calling `run` again does nothing.
	pub fn run(&self) -> usize {
		let entries = {
			let mut state = self.state.lock();
			state.closed = true;
			std::mem::take(&mut state.entries)
		};

		let count = entries.len();
		for entry in entries.into_iter().rev() {
			let Entry { id, label, cleanup, .. } = entry;
			tracing::debug!(registration = %id, object = label, "teardown");
			if catch_unwind(AssertUnwindSafe(cleanup)).is_err() {
				tracing::error!(registration = %id, object = label, "teardown cleanup panicked");
			}
		}
		count
	}
}

impl fmt::Debug for TeardownRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("TeardownRegistry")
			.field("entries", &state.entries.len())
			.field("closed", &state.closed)
			.finish()
	}
}

/// A lazily constructed singleton whose teardown is registered on first use.
pub struct Singleton<T> {
	slot: Mutex<Option<Arc<T>>>,
}

impl<T: Send + Sync + 'static> Singleton<T> {
	pub const fn new() -> Self {
		Self { slot: Mutex::new(None) }
	}

	/// Returns the instance, constructing it with `init` and registering `cleanup` the first time.
	///
	/// # Errors
	///
	/// Propagates registration errors; nothing is stored in that case and a later call retries.
	pub fn get_or_init<I, F>(&self, registry: &TeardownRegistry, init: I, cleanup: F) -> Result<Arc<T>, TeardownError>
	where
		I: FnOnce() -> T,
		F: FnOnce(Arc<T>) + Send + 'static,
	{
		let mut slot = self.slot.lock();
		if let Some(instance) = slot.as_ref() {
			return Ok(Arc::clone(instance));
		}
		let instance = Arc::new(init());
		registry.register(Arc::clone(&instance), move |object, ()| cleanup(object), ())?;
		*slot = Some(Arc::clone(&instance));
		Ok(instance)
	}

	pub fn get(&self) -> Option<Arc<T>> {
		self.slot.lock().clone()
	}
}

impl<T: Send + Sync + 'static> Default for Singleton<T> {
	fn default() -> Self {
		Self::new()
	}
}
