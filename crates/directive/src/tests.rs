use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;

#[rstest]
#[case::dynamic(
	r#"dynamic Test_Object_1_More Service_Object * Service_Config_DLL:_make_Service_Config_DLL() "Test_Object_1_More""#,
	r#"<dynamic id="Test_Object_1_More" type="Service_Object">
		<initializer init="_make_Service_Config_DLL" path="Service_Config_DLL" params="Test_Object_1_More"/>
	</dynamic>"#
)]
#[case::dynamic_no_params(
	"dynamic Refuses_Svc Service_Object * Service_Config_DLL:_make_Refuses_Init() \"\"",
	r#"<dynamic id="Refuses_Svc" type="Service_Object"><initializer init="_make_Refuses_Init" path="Service_Config_DLL" params=""/></dynamic>"#
)]
#[case::dynamic_inactive_module(
	"dynamic Clock Module libclock:make inactive",
	r#"<dynamic id="Clock" type="Module" status="inactive"><initializer path="libclock" init="make"/></dynamic>"#
)]
#[case::static_with_params(r#"static Echo "-p 4911""#, r#"<static id="Echo" params="-p 4911"/>"#)]
#[case::static_bare("static Echo", r#"<static id="Echo"></static>"#)]
#[case::remove("remove Test_Object_1_Thr", r#"<remove id="Test_Object_1_Thr"/></remove>"#)]
#[case::suspend("suspend Echo", r#"<suspend id="Echo"/>"#)]
#[case::resume("resume Echo", r#"<resume id="Echo"/>"#)]
fn both_forms_parse_to_the_same_descriptor(#[case] compact: &str, #[case] tagged: &str) {
	assert_eq!(parse(compact).unwrap(), parse(tagged).unwrap());
}

#[rstest]
#[case::empty("", ParseErrorKind::Empty)]
#[case::only_comments("# nothing here\n<!-- nor here -->", ParseErrorKind::Empty)]
#[case::unknown_keyword("stream S", ParseErrorKind::UnknownDirective("stream".into()))]
#[case::remove_without_id("remove", ParseErrorKind::MissingField("id"))]
#[case::two_directives("remove A remove B", ParseErrorKind::Trailing("remove".into()))]
#[case::garbage_after("static A junk", ParseErrorKind::Trailing("junk".into()))]
fn single_directive_errors(#[case] input: &str, #[case] expected: ParseErrorKind) {
	assert_eq!(parse(input).unwrap_err().kind, expected);
}

#[test]
fn display_renders_parsable_compact_form() {
	let originals = [
		Descriptor::install_dynamic("A", "lib/a.so", "make_a", r#"-x "quoted" \path"#),
		Descriptor::install_static("B", "").with_type(ServiceType::Stream).inactive(),
		Descriptor::remove("C"),
		Descriptor::suspend("D"),
		Descriptor::resume("E"),
	];
	for original in originals {
		assert_eq!(original.to_string().parse::<Descriptor>().unwrap(), original);
	}
}

#[test]
fn submission_mixes_forms_and_lines() {
	let text = r#"
		<?xml version="1.0"?>
		<svc_conf>
		# compact lines
		static Echo "-p 4911" remove Echo
		<dynamic id="Logger" type="Service_Object">
			<!-- initializer follows -->
			<initializer path="liblogger" init="make_logger"/>
		</dynamic>
		</svc_conf>
	"#;
	let parsed: Vec<_> = directives(text).collect::<Result<_, _>>().unwrap();
	assert_eq!(
		parsed,
		vec![
			Descriptor::install_static("Echo", "-p 4911"),
			Descriptor::remove("Echo"),
			Descriptor::install_dynamic("Logger", "liblogger", "make_logger", ""),
		]
	);
}

#[test]
fn malformed_directive_costs_one_error_and_parsing_continues() {
	let text = r#"
		static First
		dynamic Broken Servant Mod:make "x"
		<dynamic id="AlsoBroken" type="Service_Object"><initializer init="make"/></dynamic>
		remove First
	"#;
	let results: Vec<_> = directives(text).collect();
	assert_eq!(results.len(), 4);
	assert_eq!(results[0], Ok(Descriptor::install_static("First", "")));
	assert!(matches!(&results[1], Err(e) if e.kind == ParseErrorKind::UnknownServiceType("Servant".into()) && e.line == 3));
	assert!(matches!(&results[2], Err(e) if e.kind == ParseErrorKind::MissingField("path")));
	assert_eq!(results[3], Ok(Descriptor::remove("First")));
}

#[test]
fn unknown_words_between_directives_are_single_errors() {
	let results: Vec<_> = directives("bogus words here\nremove X").collect();
	assert_eq!(results.len(), 2);
	assert!(results[0].is_err());
	assert_eq!(results[1], Ok(Descriptor::remove("X")));
}

#[test]
fn unterminated_string_consumes_the_rest() {
	let results: Vec<_> = directives("static A \"never closed\nremove B").collect();
	assert_eq!(results.len(), 1);
	assert_eq!(results[0].as_ref().unwrap_err().kind, ParseErrorKind::Unterminated("string"));
}

#[test]
fn keyword_prefixed_path_does_not_split_a_malformed_directive() {
	let results: Vec<_> = directives("dynamic X Bogus static/libx.so:make \"a\"\nremove Y").collect();
	assert_eq!(results.len(), 2);
	assert!(matches!(&results[0], Err(e) if e.kind == ParseErrorKind::UnknownServiceType("Bogus".into())));
	assert_eq!(results[1], Ok(Descriptor::remove("Y")));
}

#[test]
fn keyword_used_as_id_never_becomes_a_directive() {
	let results: Vec<_> = directives("dynamic remove Bogus_Type Mod:make").collect();
	assert_eq!(results.len(), 1);
	assert!(matches!(&results[0], Err(e) if e.kind == ParseErrorKind::UnknownServiceType("Bogus_Type".into())));
}

#[test]
fn recovery_resumes_at_a_tag_on_the_same_line() {
	let results: Vec<_> = directives(r#"dynamic X Bogus Mod:make "a" <remove id="A"/>"#).collect();
	assert_eq!(results.len(), 2);
	assert!(results[0].is_err());
	assert_eq!(results[1], Ok(Descriptor::remove("A")));
}
