use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use gestalt_directive::ServiceType;
use gestalt_loader::ServiceHandle;

/// Lifecycle state of an installed service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
	Active,
	Suspended,
	/// Removed from its repository and finalized. Only seen through views pinned before removal.
	Removed,
}

impl ServiceState {
	fn from_u8(raw: u8) -> Self {
		match raw {
			0 => Self::Active,
			1 => Self::Suspended,
			_ => Self::Removed,
		}
	}

	fn as_u8(self) -> u8 {
		match self {
			Self::Active => 0,
			Self::Suspended => 1,
			Self::Removed => 2,
		}
	}
}

/// A named, live, loaded service tracked by a gestalt.
pub struct ServiceRecord {
	id: String,
	service_type: ServiceType,
	state: AtomicU8,
	handle: ServiceHandle,
}

impl ServiceRecord {
	pub(crate) fn new(id: String, service_type: ServiceType, handle: ServiceHandle) -> Self {
		Self {
			id,
			service_type,
			state: AtomicU8::new(ServiceState::Active.as_u8()),
			handle,
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn service_type(&self) -> ServiceType {
		self.service_type
	}

	pub fn state(&self) -> ServiceState {
		ServiceState::from_u8(self.state.load(Ordering::Acquire))
	}

	pub(crate) fn set_state(&self, state: ServiceState) {
		self.state.store(state.as_u8(), Ordering::Release);
	}

	pub fn handle(&self) -> &ServiceHandle {
		&self.handle
	}

	pub fn info(&self) -> String {
		self.handle.info()
	}

	/// Marks the record removed and runs `fini` if it has not run yet.
	pub(crate) fn retire(&self) {
		self.set_state(ServiceState::Removed);
		self.handle.finalize();
	}
}

impl fmt::Debug for ServiceRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceRecord")
			.field("id", &self.id)
			.field("service_type", &self.service_type)
			.field("state", &self.state())
			.field("origin", &self.handle.origin())
			.finish()
	}
}

/// Read-only view of a record, pinned for as long as the view lives.
///
/// A view taken before a removal stays valid and reports [`ServiceState::Removed`]; the module
/// behind it stays resident until the view is dropped.
#[derive(Clone)]
pub struct RecordView(pub(crate) Arc<ServiceRecord>);

impl Deref for RecordView {
	type Target = ServiceRecord;

	fn deref(&self) -> &ServiceRecord {
		&self.0
	}
}

impl fmt::Debug for RecordView {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}
