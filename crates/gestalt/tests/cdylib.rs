//! Services loaded from the real `gestalt-demo-service` shared library.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::PathBuf;

use gestalt::{DirectiveError, Gestalt, LoadError, Loader, ServiceState};
use gestalt_demo_service as _;
use pretty_assertions::assert_eq;

/// The demo cdylib, built as a dev-dependency next to this test executable.
fn demo_library() -> PathBuf {
	let exe = std::env::current_exe().unwrap();
	let deps = exe.parent().unwrap();
	let stem = format!("{DLL_PREFIX}gestalt_demo_service");
	[Some(deps), deps.parent()]
		.into_iter()
		.flatten()
		.filter_map(|dir| std::fs::read_dir(dir).ok())
		.flatten()
		.filter_map(Result::ok)
		.map(|entry| entry.path())
		.find(|path| {
			path.file_name()
				.and_then(|n| n.to_str())
				.is_some_and(|n| n.starts_with(&stem) && n.ends_with(DLL_SUFFIX))
		})
		.unwrap_or_else(|| panic!("{stem}*{DLL_SUFFIX} not found near {}", deps.display()))
}

fn install(id: &str, symbol: &str, params: &str) -> String {
	format!(
		r#"<dynamic id="{id}" type="Service_Object"><initializer path="{}" init="{symbol}" params="{params}"/></dynamic>"#,
		demo_library().display()
	)
}

#[test]
fn installs_suspends_and_removes_a_library_service() {
	let loader = Loader::default();
	let g = Gestalt::with_loader(2, loader.clone());

	assert_eq!(g.process_directive(&install("Demo", "_make_Service_Config_DLL", "Demo -v")), 0);
	assert_eq!(loader.resident_count(), 1);
	let view = g.find("Demo").unwrap();
	assert_eq!(view.info(), "Demo [active] args=Demo -v");

	assert_eq!(g.process_directive("suspend Demo"), 0);
	assert_eq!(view.state(), ServiceState::Suspended);
	assert_eq!(view.info(), "Demo [suspended] args=Demo -v");
	drop(view);

	assert_eq!(g.process_directive("remove Demo"), 0);
	assert_eq!(loader.resident_count(), 0);
}

#[test]
fn two_services_share_one_resident_library() {
	let loader = Loader::default();
	let g = Gestalt::with_loader(2, loader.clone());
	assert_eq!(g.process_directive(&install("A", "_make_Service_Config_DLL", "A")), 0);
	assert_eq!(g.process_directive(&install("B", "_make_Service_Config_DLL", "B")), 0);
	assert_eq!(loader.resident_count(), 1);
	assert_eq!(loader.refs(&demo_library().display().to_string()), Some(2));

	g.close();
	assert_eq!(loader.resident_count(), 0);
}

#[test]
fn refused_init_is_one_error_and_leaves_nothing_resident() {
	let loader = Loader::default();
	let g = Gestalt::with_loader(2, loader.clone());
	assert_eq!(g.process_directive(&install("Refuser", "_make_Refuses_Init", "")), 1);
	assert!(g.find("Refuser").is_none());
	assert_eq!(loader.resident_count(), 0);
}

#[test]
fn missing_symbol_is_reported_by_name() {
	let loader = Loader::default();
	let g = Gestalt::with_loader(2, loader.clone());
	let descriptor = install("Ghost", "_make_Nothing", "").parse().unwrap();

	let err = g.process_descriptor(&descriptor).unwrap_err();
	assert!(matches!(
		err,
		DirectiveError::Load { source: LoadError::SymbolNotFound { ref symbol, .. }, .. } if symbol == "_make_Nothing"
	));
	assert_eq!(loader.resident_count(), 0);
}

#[test]
fn abi_version_mismatch_rejects_the_install() {
	let loader = Loader::default();
	let g = Gestalt::with_loader(2, loader.clone());
	let descriptor = install("Future", "_make_Future_Abi", "").parse().unwrap();

	let err = g.process_descriptor(&descriptor).unwrap_err();
	assert!(matches!(err, DirectiveError::Load { source: LoadError::InitRejected { .. }, .. }));
	assert!(g.find("Future").is_none());
	assert_eq!(loader.resident_count(), 0);
}
