//! Dynamic service configuration runtime.
//!
//! Loads, locates, suspends, resumes and unloads named services at run time, driven by textual
//! directives (see [`gestalt_directive`]).
//!
//! # Key types
//!
//! | Type | Meaning |
//! |---|---|
//! | [`Gestalt`] | Isolated configuration universe: a bounded repository plus a loader |
//! | [`Runtime`] | Process-wide context holding the default gestalt and the teardown registry |
//! | [`Attachment`] | A foreign thread's explicit entry into the runtime |
//! | [`TeardownRegistry`] | LIFO list of process-lifetime objects and their cleanups |
//! | [`RecordView`] | Pinned, read-only view of an installed service |
//!
//! # Example
//!
//! ```no_run
//! use gestalt::{Runtime, RuntimeConfig};
//!
//! let runtime = Runtime::init(RuntimeConfig::default()).unwrap();
//! let errors = runtime.process_directive(r#"dynamic Logger Service_Object * liblogger:make_logger() "-v""#);
//! assert_eq!(errors, 0);
//! assert!(Runtime::attach().unwrap().find("Logger").is_some());
//! runtime.shutdown().unwrap();
//! ```

pub mod config;
mod error;
mod gestalt;
pub mod processor;
mod record;
mod runtime;
pub mod teardown;

pub use config::RuntimeConfig;
pub use error::{ConfigError, DirectiveError, RuntimeError};
pub use gestalt::Gestalt;
pub use gestalt_directive::{Action, Descriptor, ParseError, ServiceType};
pub use gestalt_loader::{LoadError, Loader, ModuleCatalog, ServiceArgs, ServiceError, ServiceObject, static_service};
pub use gestalt_repository::RepoError;
pub use record::{RecordView, ServiceRecord, ServiceState};
pub use runtime::{Attachment, Runtime};
pub use teardown::{RegistrationId, Singleton, TeardownError, TeardownRegistry};
