//! Entry/database import schema
//!
//! ```text
//! passwordsafe
//!   NumberHashIterations?  Preferences?  unknownheaderfields?  entry*   (in this order)
//!   Preferences          - global preferences, any order
//!   unknownheaderfields  - field*
//!   entry                - record fields, any order; title and password required
//!     ctime|atime|ltime|xtime|pmtime|rmtime  - date then time
//!     pwhistory          - status, max, num, history_entries (in this order)
//!       history_entries  - history_entry{0,255}: changed, oldpassword
//!     PasswordPolicy     - PWLength plus per-entry policy items, any order
//!     unknownrecordfields - field*
//! ```
//!
//! `field` and the `PW*` policy names occur in two places each; the document
//! region and the open parent decide which code they resolve to.

use super::datatypes::DatatypeKind;
use super::engine::StreamValidator;
use super::particles::Occurs;
use super::schema::{ElementCode, ElementDescriptor, Region, Schema, SchemaTable};
use crate::error::ValidationError;
use once_cell::sync::Lazy;

/// Element codes of the entry schema, one per declared element name
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryElement {
    Passwordsafe,
    NumberHashIterations,
    Preferences,
    UnknownHeaderFields,
    Entry,
    // Preferences
    DisplayExpandedAddEditDlg,
    MaintainDateTimeStamps,
    PWUseDigits,
    PWUseEasyVision,
    PWUseHexDigits,
    PWUseLowercase,
    PWUseSymbols,
    PWUseUppercase,
    PWMakePronounceable,
    SaveImmediately,
    SavePasswordHistory,
    ShowNotesDefault,
    ShowPWDefault,
    ShowPasswordInTree,
    ShowUsernameInTree,
    SortAscending,
    UseDefaultUser,
    PWDefaultLength,
    IdleTimeout,
    TreeDisplayStatusAtOpen,
    NumPWHistoryDefault,
    PWLowercaseMinLength,
    PWUppercaseMinLength,
    PWDigitMinLength,
    PWSymbolMinLength,
    DefaultUsername,
    DefaultAutotypeString,
    HeaderField,
    // entry
    Group,
    Title,
    Username,
    Password,
    Url,
    Autotype,
    Notes,
    Uuid,
    Ctime,
    Atime,
    Ltime,
    Xtime,
    XtimeInterval,
    Pmtime,
    Rmtime,
    Pwhistory,
    PasswordPolicy,
    UnknownRecordFields,
    // pwhistory
    Status,
    Max,
    Num,
    HistoryEntries,
    HistoryEntry,
    Changed,
    OldPassword,
    // PasswordPolicy
    PWLength,
    EntryPWUseDigits,
    EntryPWUseEasyVision,
    EntryPWUseHexDigits,
    EntryPWUseLowercase,
    EntryPWUseSymbols,
    EntryPWUseUppercase,
    EntryPWMakePronounceable,
    EntryPWLowercaseMinLength,
    EntryPWUppercaseMinLength,
    EntryPWDigitMinLength,
    EntryPWSymbolMinLength,
    RecordField,
    Date,
    Time,
}

impl ElementCode for EntryElement {
    const COUNT: usize = EntryElement::Time as usize + 1;

    fn index(self) -> usize {
        self as usize
    }
}

use EntryElement::*;

const PREFERENCE_ITEMS: &[EntryElement] = &[
    DisplayExpandedAddEditDlg,
    MaintainDateTimeStamps,
    PWUseDigits,
    PWUseEasyVision,
    PWUseHexDigits,
    PWUseLowercase,
    PWUseSymbols,
    PWUseUppercase,
    PWMakePronounceable,
    SaveImmediately,
    SavePasswordHistory,
    ShowNotesDefault,
    ShowPWDefault,
    ShowPasswordInTree,
    ShowUsernameInTree,
    SortAscending,
    UseDefaultUser,
    PWDefaultLength,
    IdleTimeout,
    TreeDisplayStatusAtOpen,
    NumPWHistoryDefault,
    PWLowercaseMinLength,
    PWUppercaseMinLength,
    PWDigitMinLength,
    PWSymbolMinLength,
    DefaultUsername,
    DefaultAutotypeString,
];

const ENTRY_FIELDS: &[EntryElement] = &[
    Group,
    Title,
    Username,
    Password,
    Url,
    Autotype,
    Notes,
    Uuid,
    Ctime,
    Atime,
    Ltime,
    Xtime,
    XtimeInterval,
    Pmtime,
    Rmtime,
    Pwhistory,
    PasswordPolicy,
    UnknownRecordFields,
];

const POLICY_ITEMS: &[EntryElement] = &[
    PWLength,
    EntryPWUseDigits,
    EntryPWUseEasyVision,
    EntryPWUseHexDigits,
    EntryPWUseLowercase,
    EntryPWUseSymbols,
    EntryPWUseUppercase,
    EntryPWMakePronounceable,
    EntryPWLowercaseMinLength,
    EntryPWUppercaseMinLength,
    EntryPWDigitMinLength,
    EntryPWSymbolMinLength,
];

const DATETIME_COMPOUNDS: &[EntryElement] = &[Ctime, Atime, Ltime, Xtime, Pmtime, Rmtime, Changed];

const DATE_TIME: &[EntryElement] = &[Date, Time];

/// Values of `TreeDisplayStatusAtOpen`
pub const DISPLAY_STATUS_VALUES: &[&str] = &["AllCollapsed", "AllExpanded", "AsPerLastSave"];

/// An entry closed without its title or password
pub const MISSING_TITLE_OR_PASSWORD: &str = "Mandatory element (title and/or password) missing.";
/// A datetime compound closed without exactly one date and one time
pub const MISSING_DATE_TIME: &str = "Missing date/time element.";
/// A pwhistory closed without its status, max and num
pub const MISSING_HISTORY_MEMBER: &str = "Missing STATUS, MAX or NUM element in PWHISTORY.";
/// A PasswordPolicy closed without PWLength
pub const MISSING_POLICY_LENGTH: &str = "Missing PWLength element in PasswordPolicy.";

const HASH_ITERATIONS: DatatypeKind = DatatypeKind::BoundedInteger { min: 2048, max: None };
const PASSWORD_LENGTH: DatatypeKind = DatatypeKind::BoundedInteger { min: 4, max: Some(1024) };
const MIN_LENGTH: DatatypeKind = DatatypeKind::BoundedInteger { min: 0, max: Some(1024) };
const HISTORY_LENGTH: DatatypeKind = DatatypeKind::BoundedInteger { min: 0, max: Some(255) };
const TIMEOUT_MINUTES: DatatypeKind = DatatypeKind::BoundedInteger { min: 1, max: Some(120) };
const EXPIRY_DAYS: DatatypeKind = DatatypeKind::BoundedInteger { min: 1, max: Some(3650) };

type Descriptor = ElementDescriptor<EntryElement>;

fn preference(name: &'static str, code: EntryElement, content: DatatypeKind) -> Descriptor {
    Descriptor::new(name, code, content).parents(&[Preferences])
}

fn global_policy(name: &'static str, code: EntryElement, content: DatatypeKind) -> Descriptor {
    preference(name, code, content).region(Region::Document)
}

fn entry_field(name: &'static str, code: EntryElement, content: DatatypeKind) -> Descriptor {
    Descriptor::new(name, code, content).parents(&[Entry])
}

fn datetime(name: &'static str, code: EntryElement, parents: &'static [EntryElement]) -> Descriptor {
    Descriptor::new(name, code, DatatypeKind::NoContent)
        .parents(parents)
        .resets(DATE_TIME)
        .members(DATE_TIME, MISSING_DATE_TIME)
}

fn entry_policy(name: &'static str, code: EntryElement, content: DatatypeKind) -> Descriptor {
    Descriptor::new(name, code, content)
        .parents(&[PasswordPolicy])
        .region(Region::Entry)
}

fn build_table() -> SchemaTable<EntryElement> {
    use DatatypeKind::{Base64Binary, Boolean, NoContent, Text};

    let descriptors = vec![
        Descriptor::new("passwordsafe", Passwordsafe, NoContent),
        Descriptor::new("NumberHashIterations", NumberHashIterations, HASH_ITERATIONS)
            .parents(&[Passwordsafe])
            .followers(&[Preferences, UnknownHeaderFields, Entry]),
        Descriptor::new("Preferences", Preferences, NoContent)
            .parents(&[Passwordsafe])
            .followers(&[UnknownHeaderFields, Entry])
            .resets(PREFERENCE_ITEMS),
        Descriptor::new("unknownheaderfields", UnknownHeaderFields, NoContent)
            .parents(&[Passwordsafe])
            .followers(&[Entry])
            .enters(Region::Header),
        Descriptor::new("entry", Entry, NoContent)
            .unbounded()
            .parents(&[Passwordsafe])
            .resets(ENTRY_FIELDS)
            .enters(Region::Entry)
            .mandatory(&[Title, Password], MISSING_TITLE_OR_PASSWORD),
        preference("DisplayExpandedAddEditDlg", DisplayExpandedAddEditDlg, Boolean),
        preference("MaintainDateTimeStamps", MaintainDateTimeStamps, Boolean),
        global_policy("PWUseDigits", PWUseDigits, Boolean),
        global_policy("PWUseEasyVision", PWUseEasyVision, Boolean),
        global_policy("PWUseHexDigits", PWUseHexDigits, Boolean),
        global_policy("PWUseLowercase", PWUseLowercase, Boolean),
        global_policy("PWUseSymbols", PWUseSymbols, Boolean),
        global_policy("PWUseUppercase", PWUseUppercase, Boolean),
        global_policy("PWMakePronounceable", PWMakePronounceable, Boolean),
        preference("SaveImmediately", SaveImmediately, Boolean),
        preference("SavePasswordHistory", SavePasswordHistory, Boolean),
        preference("ShowNotesDefault", ShowNotesDefault, Boolean),
        preference("ShowPWDefault", ShowPWDefault, Boolean),
        preference("ShowPasswordInTree", ShowPasswordInTree, Boolean),
        preference("ShowUsernameInTree", ShowUsernameInTree, Boolean),
        preference("SortAscending", SortAscending, Boolean),
        preference("UseDefaultUser", UseDefaultUser, Boolean),
        preference("PWDefaultLength", PWDefaultLength, PASSWORD_LENGTH),
        preference("IdleTimeout", IdleTimeout, TIMEOUT_MINUTES),
        preference(
            "TreeDisplayStatusAtOpen",
            TreeDisplayStatusAtOpen,
            DatatypeKind::Enumeration(DISPLAY_STATUS_VALUES),
        ),
        preference("NumPWHistoryDefault", NumPWHistoryDefault, HISTORY_LENGTH),
        global_policy("PWLowercaseMinLength", PWLowercaseMinLength, MIN_LENGTH),
        global_policy("PWUppercaseMinLength", PWUppercaseMinLength, MIN_LENGTH),
        global_policy("PWDigitMinLength", PWDigitMinLength, MIN_LENGTH),
        global_policy("PWSymbolMinLength", PWSymbolMinLength, MIN_LENGTH),
        preference("DefaultUsername", DefaultUsername, Text),
        preference("DefaultAutotypeString", DefaultAutotypeString, Text),
        Descriptor::new("field", HeaderField, Base64Binary)
            .unbounded()
            .parents(&[UnknownHeaderFields])
            .region(Region::Header),
        entry_field("group", Group, Text),
        entry_field("title", Title, Text),
        entry_field("username", Username, Text),
        entry_field("password", Password, Text),
        entry_field("url", Url, Text),
        entry_field("autotype", Autotype, Text),
        entry_field("notes", Notes, Text),
        entry_field("uuid", Uuid, DatatypeKind::Uuid),
        datetime("ctime", Ctime, &[Entry]),
        datetime("atime", Atime, &[Entry]),
        datetime("ltime", Ltime, &[Entry]),
        datetime("xtime", Xtime, &[Entry]),
        entry_field("xtime_interval", XtimeInterval, EXPIRY_DAYS),
        datetime("pmtime", Pmtime, &[Entry]),
        datetime("rmtime", Rmtime, &[Entry]),
        entry_field("pwhistory", Pwhistory, NoContent)
            .resets(&[Status, Max, Num, HistoryEntries, HistoryEntry])
            .members(&[Status, Max, Num], MISSING_HISTORY_MEMBER),
        entry_field("PasswordPolicy", PasswordPolicy, NoContent)
            .resets(POLICY_ITEMS)
            .members(&[PWLength], MISSING_POLICY_LENGTH),
        entry_field("unknownrecordfields", UnknownRecordFields, NoContent),
        Descriptor::new("status", Status, Boolean)
            .parents(&[Pwhistory])
            .followers(&[Max, Num, HistoryEntries]),
        Descriptor::new("max", Max, HISTORY_LENGTH)
            .parents(&[Pwhistory])
            .followers(&[Num, HistoryEntries]),
        Descriptor::new("num", Num, HISTORY_LENGTH)
            .parents(&[Pwhistory])
            .followers(&[HistoryEntries]),
        Descriptor::new("history_entries", HistoryEntries, NoContent).parents(&[Pwhistory]),
        Descriptor::new("history_entry", HistoryEntry, NoContent)
            .occurs(Occurs::at_most(255))
            .parents(&[HistoryEntries])
            .resets(&[Changed, OldPassword]),
        datetime("changed", Changed, &[HistoryEntry]),
        Descriptor::new("oldpassword", OldPassword, Text).parents(&[HistoryEntry]),
        entry_policy("PWLength", PWLength, PASSWORD_LENGTH),
        entry_policy("PWUseDigits", EntryPWUseDigits, Boolean),
        entry_policy("PWUseEasyVision", EntryPWUseEasyVision, Boolean),
        entry_policy("PWUseHexDigits", EntryPWUseHexDigits, Boolean),
        entry_policy("PWUseLowercase", EntryPWUseLowercase, Boolean),
        entry_policy("PWUseSymbols", EntryPWUseSymbols, Boolean),
        entry_policy("PWUseUppercase", EntryPWUseUppercase, Boolean),
        entry_policy("PWMakePronounceable", EntryPWMakePronounceable, Boolean),
        entry_policy("PWLowercaseMinLength", EntryPWLowercaseMinLength, MIN_LENGTH),
        entry_policy("PWUppercaseMinLength", EntryPWUppercaseMinLength, MIN_LENGTH),
        entry_policy("PWDigitMinLength", EntryPWDigitMinLength, MIN_LENGTH),
        entry_policy("PWSymbolMinLength", EntryPWSymbolMinLength, MIN_LENGTH),
        Descriptor::new("field", RecordField, Base64Binary)
            .unbounded()
            .parents(&[UnknownRecordFields])
            .region(Region::Entry),
        Descriptor::new("date", Date, DatatypeKind::Date)
            .parents(DATETIME_COMPOUNDS)
            .followers(&[Time]),
        Descriptor::new("time", Time, DatatypeKind::Time)
            .parents(DATETIME_COMPOUNDS)
            .prerequisites(&[Date]),
    ];

    SchemaTable::build(Passwordsafe, descriptors, &[])
}

static TABLE: Lazy<SchemaTable<EntryElement>> = Lazy::new(build_table);

/// The entry/database import schema
#[derive(Debug, Clone, Copy, Default)]
pub struct EntrySchema;

impl Schema for EntrySchema {
    type Code = EntryElement;
    type State = ();

    fn table() -> &'static SchemaTable<EntryElement> {
        &TABLE
    }

    fn unknown(name: &str) -> ValidationError {
        ValidationError::unknown_field(name)
    }
}

/// Validator for entry/database import documents
pub type EntryValidator = StreamValidator<EntrySchema>;
