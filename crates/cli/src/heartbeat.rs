//! Built-in static service, available to directives as `static Heartbeat`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use gestalt::{ServiceArgs, ServiceError, ServiceObject, static_service};

static_service!("Heartbeat", || Box::new(Heartbeat::default()));

/// Reports uptime and how often it has been suspended.
pub struct Heartbeat {
	started: Instant,
	label: String,
	pauses: AtomicU64,
}

impl Default for Heartbeat {
	fn default() -> Self {
		Self {
			started: Instant::now(),
			label: String::from("heartbeat"),
			pauses: AtomicU64::new(0),
		}
	}
}

impl ServiceObject for Heartbeat {
	fn init(&mut self, args: &ServiceArgs) -> Result<(), ServiceError> {
		match args.argv.as_slice() {
			[] => {}
			[label] => self.label = label.clone(),
			_ => return Err(ServiceError::new(format!("expected at most one label, got {:?}", args.argv))),
		}
		tracing::info!(label = %self.label, "heartbeat started");
		Ok(())
	}

	fn fini(&self) {
		tracing::info!(label = %self.label, uptime_ms = self.started.elapsed().as_millis() as u64, "heartbeat stopped");
	}

	fn suspend(&self) -> Result<(), ServiceError> {
		self.pauses.fetch_add(1, Ordering::Relaxed);
		Ok(())
	}

	fn info(&self) -> String {
		format!(
			"{} up {:?}, suspended {} times",
			self.label,
			self.started.elapsed(),
			self.pauses.load(Ordering::Relaxed)
		)
	}
}
