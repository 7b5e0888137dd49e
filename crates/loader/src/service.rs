use crate::error::ServiceError;

/// A live service produced by a module entry point or a static factory.
///
/// Hooks other than `init` take `&self`: once installed, a service is shared with lookups from
/// any thread and must do its own interior locking.
pub trait ServiceObject: Send + Sync {
	/// Called once, before the service becomes visible. An error refuses the install.
	fn init(&mut self, args: &ServiceArgs) -> Result<(), ServiceError> {
		let _ = args;
		Ok(())
	}

	/// Called exactly once when the service is removed or its gestalt closes.
	fn fini(&self) {}

	fn suspend(&self) -> Result<(), ServiceError> {
		Ok(())
	}

	fn resume(&self) -> Result<(), ServiceError> {
		Ok(())
	}

	/// Short human-readable description.
	fn info(&self) -> String {
		String::new()
	}
}

/// Parameters handed to [`ServiceObject::init`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceArgs {
	/// Parameter string exactly as written in the directive.
	pub raw: String,
	/// `raw` split on whitespace; double quotes group words and are dropped.
	pub argv: Vec<String>,
}

impl ServiceArgs {
	pub fn parse(raw: &str) -> Self {
		let mut argv = Vec::new();
		let mut current = String::new();
		let mut in_word = false;
		let mut quoted = false;

		for ch in raw.chars() {
			match ch {
				'"' => {
					quoted = !quoted;
					in_word = true;
				}
				ch if ch.is_whitespace() && !quoted => {
					if in_word {
						argv.push(std::mem::take(&mut current));
						in_word = false;
					}
				}
				ch => {
					current.push(ch);
					in_word = true;
				}
			}
		}
		if in_word {
			argv.push(current);
		}

		Self { raw: raw.to_string(), argv }
	}

	pub fn is_empty(&self) -> bool {
		self.argv.is_empty()
	}
}
