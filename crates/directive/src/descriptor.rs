use std::fmt;
use std::str::FromStr;

/// What a directive asks the runtime to do with the named service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
	/// Load (dynamic) or link (static) the service and add it to the repository.
	Install,
	/// Remove the service from the repository and unload it.
	Remove,
	/// Ask an installed service to pause.
	Suspend,
	/// Ask a suspended service to continue.
	Resume,
}

impl Action {
	/// Directive keyword for this action (`dynamic` and `static` both map to `Install`).
	pub const fn keyword(self) -> &'static str {
		match self {
			Self::Install => "install",
			Self::Remove => "remove",
			Self::Suspend => "suspend",
			Self::Resume => "resume",
		}
	}
}

/// Service type tag carried by install directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServiceType {
	#[default]
	ServiceObject,
	Module,
	Stream,
}

impl ServiceType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ServiceObject => "Service_Object",
			Self::Module => "Module",
			Self::Stream => "Stream",
		}
	}
}

impl fmt::Display for ServiceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when a type tag is not one of the known service types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownServiceType;

impl FromStr for ServiceType {
	type Err = UnknownServiceType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"Service_Object" => Ok(Self::ServiceObject),
			"Module" => Ok(Self::Module),
			"Stream" => Ok(Self::Stream),
			_ => Err(UnknownServiceType),
		}
	}
}

/// One parsed directive.
///
/// Install descriptors either carry both `module_path` and `entry_symbol` (dynamic) or neither
/// (static). Other actions carry only `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
	pub id: String,
	pub action: Action,
	pub service_type: ServiceType,
	pub module_path: Option<String>,
	pub entry_symbol: Option<String>,
	pub params: String,
	/// `false` installs the service suspended.
	pub active: bool,
}

impl Descriptor {
	fn bare(id: impl Into<String>, action: Action) -> Self {
		Self {
			id: id.into(),
			action,
			service_type: ServiceType::default(),
			module_path: None,
			entry_symbol: None,
			params: String::new(),
			active: true,
		}
	}

	/// Install a service from `module_path`, created by `entry_symbol`.
	pub fn install_dynamic(id: impl Into<String>, module_path: impl Into<String>, entry_symbol: impl Into<String>, params: impl Into<String>) -> Self {
		Self {
			module_path: Some(module_path.into()),
			entry_symbol: Some(entry_symbol.into()),
			params: params.into(),
			..Self::bare(id, Action::Install)
		}
	}

	/// Install a statically linked service.
	pub fn install_static(id: impl Into<String>, params: impl Into<String>) -> Self {
		Self {
			params: params.into(),
			..Self::bare(id, Action::Install)
		}
	}

	pub fn remove(id: impl Into<String>) -> Self {
		Self::bare(id, Action::Remove)
	}

	pub fn suspend(id: impl Into<String>) -> Self {
		Self::bare(id, Action::Suspend)
	}

	pub fn resume(id: impl Into<String>) -> Self {
		Self::bare(id, Action::Resume)
	}

	/// Sets the service type tag.
	pub fn with_type(mut self, service_type: ServiceType) -> Self {
		self.service_type = service_type;
		self
	}

	/// Marks an install as starting suspended.
	pub fn inactive(mut self) -> Self {
		self.active = false;
		self
	}

	/// True for installs that name a module and entry symbol.
	pub fn is_dynamic(&self) -> bool {
		self.action == Action::Install && self.module_path.is_some()
	}

	/// True for installs of statically linked services.
	pub fn is_static(&self) -> bool {
		self.action == Action::Install && self.module_path.is_none()
	}
}

/// Renders the descriptor in the compact syntax; the output parses back to an equal descriptor.
impl fmt::Display for Descriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.action {
			Action::Install => {
				let keyword = if self.is_dynamic() { "dynamic" } else { "static" };
				write!(f, "{keyword} {} {} *", self.id, self.service_type)?;
				if let (Some(path), Some(symbol)) = (&self.module_path, &self.entry_symbol) {
					write!(f, " {path}:{symbol}()")?;
				}
				if !self.active {
					f.write_str(" inactive")?;
				}
				f.write_str(" \"")?;
				for ch in self.params.chars() {
					if matches!(ch, '"' | '\\') {
						f.write_str("\\")?;
					}
					write!(f, "{ch}")?;
				}
				f.write_str("\"")
			}
			action => write!(f, "{} {}", action.keyword(), self.id),
		}
	}
}
