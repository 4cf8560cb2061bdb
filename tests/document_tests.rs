//! Document driver tests: whole XML texts and files through quick-xml

use pretty_assertions::assert_eq;
use pwsxml::documents::{
    detect_schema, validate_document, validate_file, validate_str, validate_stream, SchemaKind,
    ValidationReport,
};
use pwsxml::error::ErrorCode;
use pwsxml::limits::Limits;
use pwsxml::validators::{EntrySchema, FilterSchema};
use pwsxml::Error;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn temp_xml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn validation_code(result: pwsxml::Result<SchemaKind>) -> ErrorCode {
    match result {
        Err(Error::Validation(err)) => err.code,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_entry_fixture_is_valid() {
    let kind = validate_file(fixture("entries.xml"), None, &Limits::default()).unwrap();
    assert_eq!(kind, SchemaKind::Entries);
}

#[test]
fn test_filter_fixture_is_valid() {
    let kind = validate_file(fixture("filters.xml"), None, &Limits::default()).unwrap();
    assert_eq!(kind, SchemaKind::Filters);
}

#[test]
fn test_missing_password_fixture() {
    let result = validate_file(fixture("entries_missing_password.xml"), None, &Limits::default());
    let err = result.unwrap_err();
    let err = err.as_validation().unwrap();
    assert_eq!(err.code, ErrorCode::MissingMandatoryField);
    assert_eq!(err.message, "Mandatory element (title and/or password) missing.");
    assert_eq!(err.path.as_deref(), Some("/passwordsafe/entry"));
}

#[test]
fn test_explicit_schema_mismatch() {
    let result = validate_file(
        fixture("filters.xml"),
        Some(SchemaKind::Entries),
        &Limits::default(),
    );
    assert_eq!(validation_code(result), ErrorCode::UnexpectedElement);
}

#[test]
fn test_temp_file_with_bad_ftype() {
    let file = temp_xml(
        r#"<passwordsafe delimiter=","><unknownheaderfields><field ftype="3">AAAA</field></unknownheaderfields></passwordsafe>"#,
    );
    let result = validate_file(file.path(), None, &Limits::default());
    let err = result.unwrap_err();
    let err = err.as_validation().unwrap();
    assert_eq!(err.code, ErrorCode::InvalidData);
    assert_eq!(err.message, "Invalid data in attribute: ftype");
    assert_eq!(err.path.as_deref(), Some("/passwordsafe/unknownheaderfields/field"));
}

#[test]
fn test_record_field_requires_ftype() {
    let xml = r#"<passwordsafe delimiter=",">
        <entry>
          <title>t</title><password>p</password>
          <unknownrecordfields><field>AAAA</field></unknownrecordfields>
        </entry>
      </passwordsafe>"#;
    let err = validate_str::<EntrySchema>(xml, &Limits::default()).unwrap_err();
    let err = err.as_validation().unwrap();
    assert_eq!(err.code, ErrorCode::MissingElement);
    assert_eq!(err.message, "Mandatory ftype attribute missing.");
}

#[test]
fn test_filter_attributes() {
    let missing = r#"<filters><filter/></filters>"#;
    let err = validate_str::<FilterSchema>(missing, &Limits::default()).unwrap_err();
    assert_eq!(err.as_validation().unwrap().code, ErrorCode::MissingElement);

    let active = r#"<filters><filter filtername="f"><filter_entry active="maybe"/></filter></filters>"#;
    let err = validate_str::<FilterSchema>(active, &Limits::default()).unwrap_err();
    let err = err.as_validation().unwrap();
    assert_eq!(err.code, ErrorCode::InvalidData);
    assert_eq!(err.message, "Invalid data in attribute: active");
}

#[test]
fn test_empty_elements_are_closed() {
    let xml = r#"<filters><filter filtername="f"><filter_entry/></filter></filters>"#;
    let err = validate_str::<FilterSchema>(xml, &Limits::default()).unwrap_err();
    assert_eq!(err.as_validation().unwrap().code, ErrorCode::MissingMandatoryField);
}

#[test]
fn test_entity_and_cdata_text() {
    let xml = r#"<passwordsafe delimiter=";">
        <Preferences><IdleTimeout>1&#50;0</IdleTimeout></Preferences>
        <entry><title>A &amp; B</title><password><![CDATA[<secret>]]></password></entry>
      </passwordsafe>"#;
    validate_str::<EntrySchema>(xml, &Limits::default()).unwrap();
}

#[test]
fn test_text_limit() {
    let limits = Limits {
        max_text_length: 8,
        ..Limits::default()
    };
    let xml = r#"<passwordsafe delimiter=";"><entry><notes>0123456789</notes></entry></passwordsafe>"#;
    let err = validate_str::<EntrySchema>(xml, &limits).unwrap_err();
    assert!(matches!(err, Error::LimitExceeded(_)));
}

#[test]
fn test_indentation_between_children_is_not_text() {
    let mut xml = String::from("<passwordsafe delimiter=\",\">\n");
    for _ in 0..25_000 {
        xml.push_str("\t\t<entry><title>t</title><password>p</password></entry>\n");
    }
    xml.push_str("</passwordsafe>\n");
    assert!(xml.len() > 1024 * 1024);

    validate_str::<EntrySchema>(&xml, &Limits::strict()).unwrap();
    let kind = validate_document(&xml, None, &Limits::strict()).unwrap();
    assert_eq!(kind, SchemaKind::Entries);
}

#[test]
fn test_stream_detects_schema_after_prolog() {
    let xml = "<?xml version=\"1.0\"?>\n<!-- saved -->\n<filters><filter filtername=\"f\"/></filters>";
    let kind = validate_stream(xml.as_bytes(), None, &Limits::default()).unwrap();
    assert_eq!(kind, SchemaKind::Filters);

    let err = validate_stream("<database/>".as_bytes(), None, &Limits::default()).unwrap_err();
    assert!(matches!(err, Error::Value(_)));

    let err = validate_stream("<!-- empty -->".as_bytes(), None, &Limits::default()).unwrap_err();
    assert!(matches!(err, Error::Xml(_)));
}

#[test]
fn test_detected_root_is_validated() {
    let xml = r#"<filters><filter/></filters>"#;
    let err = validate_stream(xml.as_bytes(), None, &Limits::default()).unwrap_err();
    let err = err.as_validation().unwrap();
    assert_eq!(err.code, ErrorCode::MissingElement);
    assert_eq!(err.path.as_deref(), Some("/filters/filter"));

    let err = validate_stream(r#"<passwordsafe/>"#.as_bytes(), None, &Limits::default()).unwrap_err();
    assert_eq!(err.as_validation().unwrap().message, "Mandatory delimiter attribute missing.");
}

#[test]
fn test_document_size_limit() {
    let limits = Limits {
        max_document_size: 16,
        ..Limits::default()
    };
    let err = validate_document(r#"<filters>                </filters>"#, None, &limits).unwrap_err();
    assert!(matches!(err, Error::LimitExceeded(_)));
}

#[test]
fn test_element_count_limit() {
    let limits = Limits {
        max_elements: 3,
        ..Limits::default()
    };
    let xml = r#"<filters><filter filtername="a"/><filter filtername="b"/><filter filtername="c"/></filters>"#;
    let err = validate_str::<FilterSchema>(xml, &limits).unwrap_err();
    assert!(matches!(err, Error::LimitExceeded(_)));
}

#[test]
fn test_malformed_xml() {
    let xml = r#"<filters><filter filtername="x"></filters>"#;
    let err = validate_document(xml, None, &Limits::default()).unwrap_err();
    assert!(matches!(err, Error::Xml(_)));
}

#[test]
fn test_unrecognised_root() {
    let err = detect_schema("<database/>").unwrap_err();
    assert!(matches!(err, Error::Value(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = validate_file(fixture("absent.xml"), None, &Limits::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_report_json() {
    let xml = r#"<passwordsafe delimiter=";"><entry><bogus/></entry></passwordsafe>"#;
    let result = validate_document(xml, None, &Limits::default());
    let report = ValidationReport::from_result(None, &result);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["code"], "UnknownField");
    assert_eq!(json["message"], "Unknown field: bogus");
    assert_eq!(json["path"], "/passwordsafe/entry/bogus");
}
