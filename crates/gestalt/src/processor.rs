//! Directive processing.
//!
//! Every directive of a submission is applied independently: a failure costs one error and never
//! stops the directives after it. Work already committed is not rolled back.

use gestalt_directive::directives;

use crate::error::DirectiveError;
use crate::gestalt::Gestalt;

/// Applies every directive in `text` to `gestalt` and returns the number that failed.
///
/// The gestalt's mutation lock is held for the whole submission.
pub fn process(gestalt: &Gestalt, text: &str) -> usize {
	let _guard = gestalt.lock_mutations();
	let mut errors = 0;
	for parsed in directives(text) {
		let descriptor = match parsed {
			Ok(descriptor) => descriptor,
			Err(e) => {
				errors += 1;
				tracing::warn!(error = %e, "malformed directive");
				continue;
			}
		};
		if let Err(e) = gestalt.apply(&descriptor) {
			errors += 1;
			report(&descriptor.id, descriptor.action.keyword(), &e);
		}
	}
	if errors > 0 {
		tracing::warn!(errors, "submission finished with errors");
	}
	errors
}

fn report(id: &str, action: &str, error: &DirectiveError) {
	match error {
		DirectiveError::Load { source, .. } => {
			tracing::warn!(id = %id, action, error = %source, "service failed to load");
		}
		other => tracing::warn!(id = %id, action, error = %other, "directive failed"),
	}
}
