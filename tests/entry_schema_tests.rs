//! Entry/database schema tests driven through the event API

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use pwsxml::error::{ErrorCode, ValidationResult};
use pwsxml::validators::entries::{
    MISSING_DATE_TIME, MISSING_HISTORY_MEMBER, MISSING_POLICY_LENGTH, MISSING_TITLE_OR_PASSWORD,
};
use pwsxml::validators::{DatatypeKind, EntryElement, EntryValidator};

fn leaf(v: &mut EntryValidator, name: &str, text: &str) -> ValidationResult<()> {
    v.on_start_element(name)?;
    v.on_character_data(text);
    v.finish_element(name)
}

fn close(v: &mut EntryValidator, name: &str) -> ValidationResult<()> {
    v.finish_element(name)
}

fn datetime(v: &mut EntryValidator, name: &str) -> ValidationResult<()> {
    v.on_start_element(name)?;
    leaf(v, "date", "2024-02-29")?;
    leaf(v, "time", "12:30:00")?;
    close(v, name)
}

/// Validator positioned inside an open `entry`
fn in_entry() -> EntryValidator {
    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    v.on_start_element("entry").unwrap();
    v
}

#[test]
fn test_minimal_entry_end_to_end() {
    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    v.on_start_element("entry").unwrap();
    v.on_start_element("title").unwrap();
    v.on_end_element("title", "x", DatatypeKind::Text).unwrap();
    v.on_start_element("password").unwrap();
    v.on_end_element("password", "y", DatatypeKind::Text).unwrap();
    v.on_end_element("entry", "", DatatypeKind::NoContent).unwrap();
    v.on_end_element("passwordsafe", "", DatatypeKind::NoContent).unwrap();
    assert!(v.is_complete());
}

#[test]
fn test_missing_password_fails_at_entry_end() {
    let mut v = in_entry();
    leaf(&mut v, "title", "x").unwrap();
    let err = close(&mut v, "entry").unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingMandatoryField);
    assert_eq!(err.message, MISSING_TITLE_OR_PASSWORD);
}

#[test]
fn test_missing_title_fails_at_entry_end() {
    let mut v = in_entry();
    leaf(&mut v, "password", "y").unwrap();
    let err = close(&mut v, "entry").unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingMandatoryField);
}

#[test]
fn test_root_exclusivity() {
    let mut v = EntryValidator::new();
    let err = v.on_start_element("title").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);

    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    let err = v.on_start_element("passwordsafe").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);
    assert_eq!(err.message, "Unexpected element: passwordsafe");

    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    close(&mut v, "passwordsafe").unwrap();
    let err = v.on_start_element("passwordsafe").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);
}

#[test]
fn test_occurrence_is_scoped_to_entry() {
    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    for _ in 0..2 {
        v.on_start_element("entry").unwrap();
        leaf(&mut v, "title", "x").unwrap();
        leaf(&mut v, "password", "y").unwrap();
        close(&mut v, "entry").unwrap();
    }
    assert_eq!(v.occurs(EntryElement::Entry), 2);

    v.on_start_element("entry").unwrap();
    leaf(&mut v, "title", "x").unwrap();
    let err = v.on_start_element("title").unwrap_err();
    assert_eq!(err.code, ErrorCode::ExceededMaxOccurs);
    assert_eq!(err.message, "Exceeded MaxOccurs: 1");
}

#[test]
fn test_policy_item_twice_exceeds_max_occurs() {
    let mut v = in_entry();
    v.on_start_element("PasswordPolicy").unwrap();
    leaf(&mut v, "PWUseDigits", "1").unwrap();
    let err = v.on_start_element("PWUseDigits").unwrap_err();
    assert_eq!(err.code, ErrorCode::ExceededMaxOccurs);
}

#[test]
fn test_policy_item_directly_under_entry() {
    let mut v = in_entry();
    let err = v.on_start_element("PWUseDigits").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);
}

#[test]
fn test_policy_requires_length() {
    let mut v = in_entry();
    v.on_start_element("PasswordPolicy").unwrap();
    leaf(&mut v, "PWUseSymbols", "0").unwrap();
    let err = close(&mut v, "PasswordPolicy").unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingElement);
    assert_eq!(err.message, MISSING_POLICY_LENGTH);

    let mut v = in_entry();
    v.on_start_element("PasswordPolicy").unwrap();
    leaf(&mut v, "PWLength", "12").unwrap();
    leaf(&mut v, "PWDigitMinLength", "2").unwrap();
    close(&mut v, "PasswordPolicy").unwrap();
}

#[test]
fn test_global_and_entry_policy_names() {
    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    v.on_start_element("Preferences").unwrap();
    leaf(&mut v, "PWUseDigits", "1").unwrap();
    close(&mut v, "Preferences").unwrap();
    assert_eq!(v.occurs(EntryElement::PWUseDigits), 1);

    v.on_start_element("entry").unwrap();
    v.on_start_element("PasswordPolicy").unwrap();
    leaf(&mut v, "PWLength", "8").unwrap();
    leaf(&mut v, "PWUseDigits", "1").unwrap();
    assert_eq!(v.occurs(EntryElement::EntryPWUseDigits), 1);
    close(&mut v, "PasswordPolicy").unwrap();
}

#[test]
fn test_document_children_are_ordered() {
    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    leaf(&mut v, "NumberHashIterations", "2048").unwrap();
    v.on_start_element("Preferences").unwrap();
    close(&mut v, "Preferences").unwrap();
    v.on_start_element("unknownheaderfields").unwrap();
    close(&mut v, "unknownheaderfields").unwrap();
    v.on_start_element("entry").unwrap();

    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    v.on_start_element("Preferences").unwrap();
    close(&mut v, "Preferences").unwrap();
    let err = v.on_start_element("NumberHashIterations").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);

    let mut v = in_entry();
    leaf(&mut v, "title", "x").unwrap();
    leaf(&mut v, "password", "y").unwrap();
    close(&mut v, "entry").unwrap();
    let err = v.on_start_element("Preferences").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);
}

#[test]
fn test_datetime_completeness() {
    let mut v = in_entry();
    datetime(&mut v, "ctime").unwrap();
    datetime(&mut v, "pmtime").unwrap();

    let mut v = in_entry();
    v.on_start_element("atime").unwrap();
    let err = close(&mut v, "atime").unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingElement);
    assert_eq!(err.message, MISSING_DATE_TIME);

    let mut v = in_entry();
    v.on_start_element("xtime").unwrap();
    leaf(&mut v, "date", "2030-01-01").unwrap();
    let err = close(&mut v, "xtime").unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingElement);
}

#[test]
fn test_time_requires_date_first() {
    let mut v = in_entry();
    v.on_start_element("rmtime").unwrap();
    let err = v.on_start_element("time").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);

    let mut v = in_entry();
    v.on_start_element("rmtime").unwrap();
    leaf(&mut v, "date", "2020-05-05").unwrap();
    let err = v.on_start_element("date").unwrap_err();
    assert_eq!(err.code, ErrorCode::ExceededMaxOccurs);
}

#[test]
fn test_date_outside_datetime_is_unexpected() {
    let mut v = in_entry();
    let err = v.on_start_element("date").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);
}

#[test]
fn test_password_history() {
    let mut v = in_entry();
    v.on_start_element("pwhistory").unwrap();
    leaf(&mut v, "status", "1").unwrap();
    leaf(&mut v, "max", "3").unwrap();
    leaf(&mut v, "num", "1").unwrap();
    v.on_start_element("history_entries").unwrap();
    v.on_start_element("history_entry").unwrap();
    datetime(&mut v, "changed").unwrap();
    leaf(&mut v, "oldpassword", "hunter2").unwrap();
    close(&mut v, "history_entry").unwrap();
    close(&mut v, "history_entries").unwrap();
    close(&mut v, "pwhistory").unwrap();
}

#[test]
fn test_password_history_members() {
    let mut v = in_entry();
    v.on_start_element("pwhistory").unwrap();
    leaf(&mut v, "status", "1").unwrap();
    leaf(&mut v, "max", "3").unwrap();
    let err = close(&mut v, "pwhistory").unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingElement);
    assert_eq!(err.message, MISSING_HISTORY_MEMBER);

    let mut v = in_entry();
    v.on_start_element("pwhistory").unwrap();
    leaf(&mut v, "max", "3").unwrap();
    let err = v.on_start_element("status").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedElement);
}

#[test]
fn test_history_entry_limit() {
    let mut v = in_entry();
    v.on_start_element("pwhistory").unwrap();
    leaf(&mut v, "status", "1").unwrap();
    leaf(&mut v, "max", "255").unwrap();
    leaf(&mut v, "num", "255").unwrap();
    v.on_start_element("history_entries").unwrap();
    for _ in 0..255 {
        v.on_start_element("history_entry").unwrap();
        leaf(&mut v, "oldpassword", "old").unwrap();
        close(&mut v, "history_entry").unwrap();
    }
    let err = v.on_start_element("history_entry").unwrap_err();
    assert_eq!(err.code, ErrorCode::ExceededMaxOccurs);
    assert_eq!(err.message, "Exceeded MaxOccurs: 255");
}

#[test]
fn test_history_entry_fields_reset_per_entry() {
    let mut v = in_entry();
    v.on_start_element("pwhistory").unwrap();
    leaf(&mut v, "status", "0").unwrap();
    leaf(&mut v, "max", "2").unwrap();
    leaf(&mut v, "num", "2").unwrap();
    v.on_start_element("history_entries").unwrap();
    for _ in 0..2 {
        v.on_start_element("history_entry").unwrap();
        datetime(&mut v, "changed").unwrap();
        leaf(&mut v, "oldpassword", "old").unwrap();
        close(&mut v, "history_entry").unwrap();
    }
    assert_eq!(v.occurs(EntryElement::HistoryEntry), 2);
    assert_eq!(v.occurs(EntryElement::OldPassword), 1);
}

#[test]
fn test_unknown_fields_by_region() {
    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    v.on_start_element("unknownheaderfields").unwrap();
    leaf(&mut v, "field", "AAECAw==").unwrap();
    leaf(&mut v, "field", "BAUG").unwrap();
    assert_eq!(v.occurs(EntryElement::HeaderField), 2);
    close(&mut v, "unknownheaderfields").unwrap();

    v.on_start_element("entry").unwrap();
    v.on_start_element("unknownrecordfields").unwrap();
    leaf(&mut v, "field", "AAECAw==").unwrap();
    assert_eq!(v.occurs(EntryElement::RecordField), 1);
    let err = leaf(&mut v, "field", "not base64!").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidData);
    assert_eq!(err.message, "Invalid data in element: field");
}

#[test]
fn test_unknown_name_is_unknown_field() {
    let mut v = in_entry();
    let err = v.on_start_element("colour").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownField);
    assert_eq!(err.message, "Unknown field: colour");
}

#[test]
fn test_datatype_boundaries() {
    let idle = |value: &str| {
        let mut v = EntryValidator::new();
        v.on_start_element("passwordsafe").unwrap();
        v.on_start_element("Preferences").unwrap();
        leaf(&mut v, "IdleTimeout", value)
    };
    assert!(idle("1").is_ok());
    assert!(idle("120").is_ok());
    assert!(idle(" 60\n").is_ok());
    assert_eq!(idle("0").unwrap_err().code, ErrorCode::InvalidData);
    assert_eq!(idle("121").unwrap_err().code, ErrorCode::InvalidData);
    assert_eq!(idle("ten").unwrap_err().code, ErrorCode::InvalidData);
    assert_eq!(idle("").unwrap_err().code, ErrorCode::InvalidData);

    let iterations = |value: &str| {
        let mut v = EntryValidator::new();
        v.on_start_element("passwordsafe").unwrap();
        leaf(&mut v, "NumberHashIterations", value)
    };
    assert!(iterations("2048").is_ok());
    assert!(iterations("2047").is_err());
}

#[test]
fn test_epoch_date_always_accepted() {
    let mut v = in_entry();
    v.on_start_element("ctime").unwrap();
    leaf(&mut v, "date", "1970-01-01").unwrap();
    leaf(&mut v, "time", "00:00:00").unwrap();
    close(&mut v, "ctime").unwrap();

    v.on_start_element("atime").unwrap();
    let err = leaf(&mut v, "date", "2023-02-30").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidData);
}

#[test]
fn test_uuid_and_enumerations() {
    let mut v = in_entry();
    leaf(&mut v, "uuid", "0123456789abcdef0123456789ABCDEF").unwrap();

    let mut v = in_entry();
    assert!(leaf(&mut v, "uuid", "0123").is_err());

    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    v.on_start_element("Preferences").unwrap();
    leaf(&mut v, "TreeDisplayStatusAtOpen", "AllExpanded").unwrap();
    let err = leaf(&mut v, "SortAscending", "yes").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidData);
}

#[test]
fn test_character_data_chunks_are_concatenated() {
    let mut v = EntryValidator::new();
    v.on_start_element("passwordsafe").unwrap();
    v.on_start_element("Preferences").unwrap();
    v.on_start_element("PWDefaultLength").unwrap();
    v.on_character_data("1");
    v.on_character_data("02");
    v.on_character_data("4");
    close(&mut v, "PWDefaultLength").unwrap();
}

const ENTRY_FIELDS: &[(&str, &str)] = &[
    ("group", "Mail"),
    ("title", "Inbox"),
    ("username", "alice"),
    ("password", "secret"),
    ("url", "https://example.org"),
    ("notes", "none"),
    ("xtime_interval", "30"),
];

proptest! {
    #[test]
    fn prop_entry_fields_accept_any_order(
        order in Just((0..ENTRY_FIELDS.len()).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let mut v = in_entry();
        for index in &order {
            let (name, text) = ENTRY_FIELDS[*index];
            prop_assert!(leaf(&mut v, name, text).is_ok());
        }
        for code in [EntryElement::Group, EntryElement::Title, EntryElement::Password, EntryElement::XtimeInterval] {
            prop_assert_eq!(v.occurs(code), 1);
        }
        prop_assert!(close(&mut v, "entry").is_ok());
    }

    #[test]
    fn prop_idle_timeout_range(value in 0u64..500) {
        let mut v = EntryValidator::new();
        v.on_start_element("passwordsafe").unwrap();
        v.on_start_element("Preferences").unwrap();
        let result = leaf(&mut v, "IdleTimeout", &value.to_string());
        prop_assert_eq!(result.is_ok(), (1..=120).contains(&value));
    }
}
