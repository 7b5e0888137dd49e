//! Statically linked services.
//!
//! Services compiled into the host are listed at link time with [`static_service!`] and can be
//! added at run time with [`Loader::register_static`](crate::Loader::register_static). Runtime
//! registrations shadow link-time ones of the same name.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::service::ServiceObject;

/// A link-time static service definition.
pub struct StaticServiceDef {
	/// Name used by `static` directives.
	pub name: &'static str,
	/// Builds a fresh, uninitialized service object.
	pub make: fn() -> Box<dyn ServiceObject>,
}

/// Registry wrapper for link-time static services.
pub struct StaticServiceReg(pub &'static StaticServiceDef);
inventory::collect!(StaticServiceReg);

/// Factory for a runtime-registered static service.
pub type StaticFactory = Arc<dyn Fn() -> Box<dyn ServiceObject> + Send + Sync>;

static LINKED: LazyLock<HashMap<&'static str, &'static StaticServiceDef>> = LazyLock::new(|| {
	let mut map = HashMap::new();
	for reg in inventory::iter::<StaticServiceReg> {
		if map.insert(reg.0.name, reg.0).is_some() {
			tracing::warn!(name = reg.0.name, "static service linked twice; last definition wins");
		}
	}
	map
});

/// Finds a link-time static service by name.
pub fn find_linked(name: &str) -> Option<&'static StaticServiceDef> {
	LINKED.get(name).copied()
}

/// Names of every link-time static service, sorted.
pub fn linked_names() -> Vec<&'static str> {
	let mut names: Vec<_> = LINKED.keys().copied().collect();
	names.sort_unstable();
	names
}

/// Registers a statically linked service under `name`.
///
/// ```ignore
/// gestalt_loader::static_service!("Heartbeat", || Box::new(Heartbeat::default()));
/// ```
#[macro_export]
macro_rules! static_service {
	($name:expr, $make:expr $(,)?) => {
		const _: () = {
			static DEF: $crate::StaticServiceDef = $crate::StaticServiceDef { name: $name, make: $make };
			$crate::__private::inventory::submit! { $crate::StaticServiceReg(&DEF) }
		};
	};
}
