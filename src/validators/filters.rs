//! Saved-filter import schema
//!
//! ```text
//! filters
//!   filter*                  (filtername attribute)
//!     filter_entry*          (optional active attribute)
//!       <one field>          group, title, user, create_time, ...
//!         rule logic test    (in this order)
//!           test             string case warn | num1 num2 | date1 date2 | type
//! ```
//!
//! The field chosen in a `filter_entry` fixes the rule family for the rest of
//! the entry: which match-rule keywords `rule` may carry, whether `rule` and
//! `test` appear at all, and which value elements `test` must contain.

use super::context::ValidationContext;
use super::datatypes::DatatypeKind;
use super::engine::StreamValidator;
use super::schema::{ElementCode, ElementDescriptor, Schema, SchemaTable};
use crate::error::{ErrorCode, ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use std::fmt;
use std::ops::BitOr;

/// Set of rule families, used both for the family of a field and for the
/// families a keyword or value element applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RuleFamily(u16);

impl RuleFamily {
    /// No family
    pub const NONE: RuleFamily = RuleFamily(0);
    /// Plain string fields
    pub const STRING: RuleFamily = RuleFamily(1 << 0);
    /// String fields that may also be tested for presence
    pub const STRING_PRESENT: RuleFamily = RuleFamily(1 << 1);
    /// The password field, which may also be tested for expiry
    pub const PASSWORD: RuleFamily = RuleFamily(1 << 2);
    /// Numeric fields
    pub const INTEGER: RuleFamily = RuleFamily(1 << 3);
    /// Timestamp fields
    pub const DATE: RuleFamily = RuleFamily(1 << 4);
    /// Fields tested only for presence
    pub const BOOL_PRESENT: RuleFamily = RuleFamily(1 << 5);
    /// Fields tested for being active
    pub const BOOL_ACTIVE: RuleFamily = RuleFamily(1 << 6);
    /// Fields tested for being set
    pub const BOOL_SET: RuleFamily = RuleFamily(1 << 7);
    /// The entry type field
    pub const ENTRY_TYPE: RuleFamily = RuleFamily(1 << 8);
    /// The password history sub-filter
    pub const PW_HISTORY: RuleFamily = RuleFamily(1 << 9);
    /// The password policy sub-filter
    pub const PW_POLICY: RuleFamily = RuleFamily(1 << 10);

    /// Families with no `test` element
    pub const BOOLEAN: RuleFamily = Self::BOOL_PRESENT.union(Self::BOOL_ACTIVE).union(Self::BOOL_SET);
    /// Families compared against a string
    pub const TEXTUAL: RuleFamily = Self::STRING.union(Self::STRING_PRESENT).union(Self::PASSWORD);
    /// Families that only switch on a nested filter and carry just `logic`
    pub const SUBFILTER: RuleFamily = Self::PW_HISTORY.union(Self::PW_POLICY);

    /// Combine two sets
    pub const fn union(self, other: RuleFamily) -> RuleFamily {
        RuleFamily(self.0 | other.0)
    }

    /// Check if every family of `other` is in `self`
    pub fn contains(self, other: RuleFamily) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// Check if the sets share a family
    pub fn intersects(self, other: RuleFamily) -> bool {
        self.0 & other.0 != 0
    }

    /// Check if the set holds no family
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RuleFamily {
    type Output = RuleFamily;

    fn bitor(self, rhs: RuleFamily) -> RuleFamily {
        self.union(rhs)
    }
}

/// Match rules, keyed by their two-letter keyword
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchRule {
    Invalid,
    Equals,
    NotEqual,
    Active,
    Inactive,
    Present,
    NotPresent,
    Set,
    NotSet,
    Is,
    IsNot,
    Begins,
    NotBegin,
    Ends,
    NotEnd,
    Contains,
    NotContain,
    Between,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Before,
    After,
    Expired,
    WillExpire,
}

/// All keywords accepted as `rule` content
pub const RULE_KEYWORDS: &[&str] = &[
    "NA", "EQ", "NE", "AC", "IA", "PR", "NP", "SE", "NS", "IS", "NI", "BE", "NB", "EN", "ND", "CO",
    "NC", "BT", "LT", "LE", "GT", "GE", "BF", "AF", "EX", "WX",
];

impl MatchRule {
    /// Parse a two-letter rule keyword
    pub fn from_keyword(keyword: &str) -> Option<MatchRule> {
        let rule = match keyword {
            "NA" => MatchRule::Invalid,
            "EQ" => MatchRule::Equals,
            "NE" => MatchRule::NotEqual,
            "AC" => MatchRule::Active,
            "IA" => MatchRule::Inactive,
            "PR" => MatchRule::Present,
            "NP" => MatchRule::NotPresent,
            "SE" => MatchRule::Set,
            "NS" => MatchRule::NotSet,
            "IS" => MatchRule::Is,
            "NI" => MatchRule::IsNot,
            "BE" => MatchRule::Begins,
            "NB" => MatchRule::NotBegin,
            "EN" => MatchRule::Ends,
            "ND" => MatchRule::NotEnd,
            "CO" => MatchRule::Contains,
            "NC" => MatchRule::NotContain,
            "BT" => MatchRule::Between,
            "LT" => MatchRule::LessThan,
            "LE" => MatchRule::LessOrEqual,
            "GT" => MatchRule::GreaterThan,
            "GE" => MatchRule::GreaterOrEqual,
            "BF" => MatchRule::Before,
            "AF" => MatchRule::After,
            "EX" => MatchRule::Expired,
            "WX" => MatchRule::WillExpire,
            _ => return None,
        };
        Some(rule)
    }

    /// Two-letter keyword of the rule
    pub fn keyword(self) -> &'static str {
        match self {
            MatchRule::Invalid => "NA",
            MatchRule::Equals => "EQ",
            MatchRule::NotEqual => "NE",
            MatchRule::Active => "AC",
            MatchRule::Inactive => "IA",
            MatchRule::Present => "PR",
            MatchRule::NotPresent => "NP",
            MatchRule::Set => "SE",
            MatchRule::NotSet => "NS",
            MatchRule::Is => "IS",
            MatchRule::IsNot => "NI",
            MatchRule::Begins => "BE",
            MatchRule::NotBegin => "NB",
            MatchRule::Ends => "EN",
            MatchRule::NotEnd => "ND",
            MatchRule::Contains => "CO",
            MatchRule::NotContain => "NC",
            MatchRule::Between => "BT",
            MatchRule::LessThan => "LT",
            MatchRule::LessOrEqual => "LE",
            MatchRule::GreaterThan => "GT",
            MatchRule::GreaterOrEqual => "GE",
            MatchRule::Before => "BF",
            MatchRule::After => "AF",
            MatchRule::Expired => "EX",
            MatchRule::WillExpire => "WX",
        }
    }

    /// Rule families the keyword may be used with
    pub fn families(self) -> RuleFamily {
        use RuleFamily as R;

        let text = R::STRING | R::STRING_PRESENT;
        match self {
            MatchRule::Invalid => R::NONE,
            MatchRule::Equals | MatchRule::NotEqual => R::DATE | R::INTEGER | R::PASSWORD | text,
            MatchRule::Active | MatchRule::Inactive => R::BOOL_ACTIVE,
            MatchRule::Present | MatchRule::NotPresent => {
                R::BOOL_PRESENT | R::DATE | R::INTEGER | R::STRING_PRESENT
            }
            MatchRule::Set | MatchRule::NotSet => R::BOOL_SET,
            MatchRule::Is | MatchRule::IsNot => R::ENTRY_TYPE,
            MatchRule::Begins
            | MatchRule::NotBegin
            | MatchRule::Ends
            | MatchRule::NotEnd
            | MatchRule::Contains
            | MatchRule::NotContain => R::PASSWORD | text,
            MatchRule::Between => R::DATE | R::INTEGER,
            MatchRule::LessThan
            | MatchRule::LessOrEqual
            | MatchRule::GreaterThan
            | MatchRule::GreaterOrEqual => R::INTEGER,
            MatchRule::Before | MatchRule::After => R::DATE,
            MatchRule::Expired | MatchRule::WillExpire => R::PASSWORD,
        }
    }

    /// Check if the keyword may be used with a field of `family`
    pub fn applies_to(self, family: RuleFamily) -> bool {
        self.families().contains(family)
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Element codes of the filter schema, one per declared element name
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FilterElement {
    Filters,
    Filter,
    FilterEntry,
    // fields
    Group,
    GroupTitle,
    Title,
    User,
    Notes,
    Password,
    CreateTime,
    PasswordModifiedTime,
    LastAccessTime,
    ExpiryTime,
    RecordModifiedTime,
    Url,
    Autotype,
    PasswordExpiryInterval,
    PasswordHistory,
    HistoryPresent,
    HistoryActive,
    HistoryNumber,
    HistoryMaximum,
    HistoryChangeDate,
    HistoryPasswords,
    PasswordPolicy,
    PolicyPresent,
    PolicyLength,
    PolicyNumberLowercase,
    PolicyNumberUppercase,
    PolicyNumberDigits,
    PolicyNumberSymbols,
    PolicyEasyVision,
    PolicyPronounceable,
    PolicyHexadecimal,
    EntryType,
    UnknownFields,
    // field content
    Rule,
    Logic,
    Test,
    // test content
    StringValue,
    Case,
    Warn,
    Num1,
    Num2,
    Date1,
    Date2,
    Type,
}

impl ElementCode for FilterElement {
    const COUNT: usize = FilterElement::Type as usize + 1;

    fn index(self) -> usize {
        self as usize
    }
}

impl FilterElement {
    /// Rule family of a field element; None for structural elements
    pub fn field_family(self) -> Option<RuleFamily> {
        use FilterElement as F;
        use RuleFamily as R;

        let family = match self {
            F::GroupTitle | F::Title => R::STRING,
            F::Group | F::User | F::Notes | F::Url | F::Autotype => R::STRING_PRESENT,
            F::Password | F::HistoryPasswords => R::PASSWORD,
            F::CreateTime
            | F::PasswordModifiedTime
            | F::LastAccessTime
            | F::ExpiryTime
            | F::RecordModifiedTime
            | F::HistoryChangeDate => R::DATE,
            F::PasswordExpiryInterval
            | F::HistoryNumber
            | F::HistoryMaximum
            | F::PolicyLength
            | F::PolicyNumberLowercase
            | F::PolicyNumberUppercase
            | F::PolicyNumberDigits
            | F::PolicyNumberSymbols => R::INTEGER,
            F::HistoryPresent | F::PolicyPresent | F::UnknownFields => R::BOOL_PRESENT,
            F::HistoryActive => R::BOOL_ACTIVE,
            F::PolicyEasyVision | F::PolicyPronounceable | F::PolicyHexadecimal => R::BOOL_SET,
            F::EntryType => R::ENTRY_TYPE,
            F::PasswordHistory => R::PW_HISTORY,
            F::PasswordPolicy => R::PW_POLICY,
            _ => return None,
        };
        Some(family)
    }

    /// Families whose `test` may contain this value element
    fn value_families(self) -> Option<RuleFamily> {
        use FilterElement as F;
        use RuleFamily as R;

        match self {
            F::StringValue | F::Case => Some(R::TEXTUAL),
            F::Warn => Some(R::PASSWORD),
            // relative date tests count days
            F::Num1 | F::Num2 => Some(R::INTEGER | R::DATE),
            F::Date1 | F::Date2 => Some(R::DATE),
            F::Type => Some(R::ENTRY_TYPE),
            _ => None,
        }
    }
}

/// Values of a `type` test
pub const ENTRY_TYPE_VALUES: &[&str] = &["normal", "alias", "shortcut", "aliasbase", "shortcutbase"];

/// Values of `logic`
/// Values of `logic`
pub const LOGIC_VALUES: &[&str] = &["and", "or"];

/// Values of the `active` attribute of `filter_entry`
pub const ACTIVE_VALUES: &[&str] = &["yes", "no"];

/// A filter_entry closed without its field, rule, logic or test
pub const MISSING_FILTER_PART: &str =
    "Mandatory element (field, rule, logic and/or test) missing.";

const FIELDS: &[FilterElement] = {
    use FilterElement::*;
    &[
        Group,
        GroupTitle,
        Title,
        User,
        Notes,
        Password,
        CreateTime,
        PasswordModifiedTime,
        LastAccessTime,
        ExpiryTime,
        RecordModifiedTime,
        Url,
        Autotype,
        PasswordExpiryInterval,
        PasswordHistory,
        HistoryPresent,
        HistoryActive,
        HistoryNumber,
        HistoryMaximum,
        HistoryChangeDate,
        HistoryPasswords,
        PasswordPolicy,
        PolicyPresent,
        PolicyLength,
        PolicyNumberLowercase,
        PolicyNumberUppercase,
        PolicyNumberDigits,
        PolicyNumberSymbols,
        PolicyEasyVision,
        PolicyPronounceable,
        PolicyHexadecimal,
        EntryType,
        UnknownFields,
    ]
};

const ENTRY_SCOPE: &[FilterElement] = {
    use FilterElement::*;
    &[
        Group,
        GroupTitle,
        Title,
        User,
        Notes,
        Password,
        CreateTime,
        PasswordModifiedTime,
        LastAccessTime,
        ExpiryTime,
        RecordModifiedTime,
        Url,
        Autotype,
        PasswordExpiryInterval,
        PasswordHistory,
        HistoryPresent,
        HistoryActive,
        HistoryNumber,
        HistoryMaximum,
        HistoryChangeDate,
        HistoryPasswords,
        PasswordPolicy,
        PolicyPresent,
        PolicyLength,
        PolicyNumberLowercase,
        PolicyNumberUppercase,
        PolicyNumberDigits,
        PolicyNumberSymbols,
        PolicyEasyVision,
        PolicyPronounceable,
        PolicyHexadecimal,
        EntryType,
        UnknownFields,
        Rule,
        Logic,
        Test,
        StringValue,
        Case,
        Warn,
        Num1,
        Num2,
        Date1,
        Date2,
        Type,
    ]
};

const STRING_TEST: &[&[FilterElement]] = &[&[FilterElement::StringValue, FilterElement::Case]];
const PASSWORD_TEST: &[&[FilterElement]] = &[&[
    FilterElement::StringValue,
    FilterElement::Case,
    FilterElement::Warn,
]];
const INTEGER_TEST: &[&[FilterElement]] = &[&[FilterElement::Num1, FilterElement::Num2]];
const DATE_TEST: &[&[FilterElement]] = &[
    &[FilterElement::Date1, FilterElement::Date2],
    &[FilterElement::Num1, FilterElement::Num2],
];
const ENTRY_TYPE_TEST: &[&[FilterElement]] = &[&[FilterElement::Type]];

type Descriptor = ElementDescriptor<FilterElement>;

fn field(name: &'static str, code: FilterElement) -> Descriptor {
    Descriptor::new(name, code, DatatypeKind::NoContent).parents(&[FilterElement::FilterEntry])
}

fn test_value(name: &'static str, code: FilterElement, content: DatatypeKind) -> Descriptor {
    Descriptor::new(name, code, content).parents(&[FilterElement::Test])
}

fn build_table() -> SchemaTable<FilterElement> {
    use DatatypeKind::{Boolean, Enumeration, Integer, NoContent};
    use FilterElement::*;

    let descriptors = vec![
        Descriptor::new("filters", Filters, NoContent),
        Descriptor::new("filter", Filter, NoContent)
            .unbounded()
            .parents(&[Filters]),
        Descriptor::new("filter_entry", FilterEntry, NoContent)
            .unbounded()
            .parents(&[Filter])
            .resets(ENTRY_SCOPE),
        field("group", Group),
        field("grouptitle", GroupTitle),
        field("title", Title),
        field("user", User),
        field("notes", Notes),
        field("password", Password),
        field("create_time", CreateTime),
        field("password_modified_time", PasswordModifiedTime),
        field("last_access_time", LastAccessTime),
        field("expiry_time", ExpiryTime),
        field("record_modified_time", RecordModifiedTime),
        field("url", Url),
        field("autotype", Autotype),
        field("password_expiry_interval", PasswordExpiryInterval),
        field("password_history", PasswordHistory),
        field("history_present", HistoryPresent),
        field("history_active", HistoryActive),
        field("history_number", HistoryNumber),
        field("history_maximum", HistoryMaximum),
        field("history_changedate", HistoryChangeDate),
        field("history_passwords", HistoryPasswords),
        field("password_policy", PasswordPolicy),
        field("policy_present", PolicyPresent),
        field("policy_length", PolicyLength),
        field("policy_number_lowercase", PolicyNumberLowercase),
        field("policy_number_uppercase", PolicyNumberUppercase),
        field("policy_number_digits", PolicyNumberDigits),
        field("policy_number_symbols", PolicyNumberSymbols),
        field("policy_easyvision", PolicyEasyVision),
        field("policy_pronounceable", PolicyPronounceable),
        field("policy_hexadecimal", PolicyHexadecimal),
        field("entrytype", EntryType),
        field("unknownfields", UnknownFields),
        Descriptor::new("rule", Rule, Enumeration(RULE_KEYWORDS))
            .parents(FIELDS)
            .followers(&[Logic, Test]),
        Descriptor::new("logic", Logic, Enumeration(LOGIC_VALUES))
            .parents(FIELDS)
            .followers(&[Test]),
        Descriptor::new("test", Test, NoContent)
            .parents(FIELDS)
            .prerequisites(&[Logic]),
        // left empty for presence rules
        test_value("string", StringValue, NoContent).followers(&[Case, Warn]),
        test_value("case", Case, Boolean)
            .prerequisites(&[StringValue])
            .followers(&[Warn]),
        test_value("warn", Warn, Integer).prerequisites(&[StringValue, Case]),
        test_value("num1", Num1, Integer).followers(&[Num2, Date1, Date2]),
        test_value("num2", Num2, Integer).prerequisites(&[Num1]),
        test_value("date1", Date1, DatatypeKind::Date).followers(&[Date2, Num1, Num2]),
        test_value("date2", Date2, DatatypeKind::Date).prerequisites(&[Date1]),
        test_value("type", Type, Enumeration(ENTRY_TYPE_VALUES)),
    ];

    SchemaTable::build(Filters, descriptors, &[("username", User)])
}

static TABLE: Lazy<SchemaTable<FilterElement>> = Lazy::new(build_table);

/// Field chosen in the open `filter_entry`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterState {
    /// The field element, once opened
    pub field: Option<FilterElement>,
    /// Family of the chosen field
    pub family: RuleFamily,
}

/// The saved-filter import schema
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterSchema;

impl FilterSchema {
    /// Value elements `test` must hold for a family, as alternatives
    fn required_values(family: RuleFamily) -> &'static [&'static [FilterElement]] {
        if family == RuleFamily::PASSWORD {
            PASSWORD_TEST
        } else if family.intersects(RuleFamily::TEXTUAL) {
            STRING_TEST
        } else if family == RuleFamily::INTEGER {
            INTEGER_TEST
        } else if family == RuleFamily::DATE {
            DATE_TEST
        } else if family == RuleFamily::ENTRY_TYPE {
            ENTRY_TYPE_TEST
        } else {
            &[]
        }
    }

    /// Parts a complete `filter_entry` holds besides its field
    fn required_parts(family: RuleFamily) -> &'static [FilterElement] {
        use FilterElement::*;

        if family.intersects(RuleFamily::SUBFILTER) {
            &[Logic]
        } else if family.intersects(RuleFamily::BOOLEAN) {
            &[Rule, Logic]
        } else {
            &[Rule, Logic, Test]
        }
    }

    fn check_test_values(ctx: &ValidationContext<Self>) -> ValidationResult<()> {
        let alternatives = Self::required_values(ctx.state().family);
        if alternatives.is_empty() || alternatives.iter().any(|set| ctx.each_once(set)) {
            return Ok(());
        }

        // Report against the first alternative that was started, else the first
        let chosen = alternatives
            .iter()
            .find(|set| set.first().map_or(false, |code| ctx.occurs(*code) > 0))
            .or_else(|| alternatives.first())
            .copied()
            .unwrap_or(&[]);
        let missing = chosen
            .iter()
            .find(|code| ctx.occurs(**code) != 1)
            .and_then(|code| Self::table().descriptor(*code))
            .map_or("test", |d| d.name);

        Err(ValidationError::new(
            ErrorCode::MissingElement,
            format!("Missing test element: {}", missing),
        ))
    }
}

impl Schema for FilterSchema {
    type Code = FilterElement;
    type State = FilterState;

    fn table() -> &'static SchemaTable<FilterElement> {
        &TABLE
    }

    fn unknown(name: &str) -> ValidationError {
        ValidationError::unknown_element(name)
    }

    fn check_start(descriptor: &Descriptor, ctx: &ValidationContext<Self>) -> ValidationResult<()> {
        let unexpected = || Err(ValidationError::unexpected_element(descriptor.name));
        let state = ctx.state();

        if descriptor.code.field_family().is_some() {
            // one field per filter_entry
            return if state.field.is_some() { unexpected() } else { Ok(()) };
        }

        let family = state.family;
        let allowed = match descriptor.code {
            FilterElement::Rule => !family.intersects(RuleFamily::SUBFILTER),
            FilterElement::Logic => {
                family.intersects(RuleFamily::SUBFILTER) || ctx.occurs(FilterElement::Rule) == 1
            }
            FilterElement::Test => !family.intersects(RuleFamily::BOOLEAN | RuleFamily::SUBFILTER),
            code => code
                .value_families()
                .map_or(true, |families| families.intersects(family)),
        };

        if allowed {
            Ok(())
        } else {
            unexpected()
        }
    }

    fn enter(descriptor: &Descriptor, ctx: &mut ValidationContext<Self>) {
        if descriptor.code == FilterElement::FilterEntry {
            *ctx.state_mut() = FilterState::default();
        } else if let Some(family) = descriptor.code.field_family() {
            *ctx.state_mut() = FilterState {
                field: Some(descriptor.code),
                family,
            };
        }
    }

    fn check_end(descriptor: &Descriptor, text: &str, ctx: &ValidationContext<Self>) -> ValidationResult<()> {
        match descriptor.code {
            FilterElement::Rule => {
                let rule = MatchRule::from_keyword(text)
                    .ok_or_else(|| ValidationError::invalid_data(descriptor.name))?;
                if rule.applies_to(ctx.state().family) {
                    Ok(())
                } else {
                    Err(ValidationError::unexpected_element(descriptor.name))
                }
            }
            FilterElement::Test => Self::check_test_values(ctx),
            FilterElement::FilterEntry => {
                let state = ctx.state();
                let complete = state.field.is_some()
                    && ctx.each_once(Self::required_parts(state.family));
                if complete {
                    Ok(())
                } else {
                    Err(ValidationError::new(
                        ErrorCode::MissingMandatoryField,
                        MISSING_FILTER_PART,
                    ))
                }
            }
            _ => Ok(()),
        }
    }
}

/// Validator for saved-filter import documents
pub type FilterValidator = StreamValidator<FilterSchema>;
