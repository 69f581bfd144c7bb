//! Remote property bags
//!
//! A remote page carries a map of named, typed properties. Each property is
//! decoded on its own into a [`PropertyValue`], so a malformed or drifted
//! property degrades to a default instead of failing the whole page.

mod mapping;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

pub use mapping::{case_properties, map_case, map_summons, summons_properties, LOCAL_ID_PROPERTY};

/// Property map sent to the remote system on create/update
pub type PropertyMap = Map<String, Value>;

/// Remote rich text is limited to this many characters per span
const RICH_TEXT_SPAN_LIMIT: usize = 2000;

/// Payload keys of the property shapes the mapper understands
const SHAPES: &[&str] = &[
    "title",
    "rich_text",
    "select",
    "status",
    "multi_select",
    "checkbox",
    "date",
    "relation",
    "phone_number",
    "email",
    "number",
];

/// Errors that make a single remote page unmappable
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("remote page is not a JSON object")]
    NotAnObject,
    #[error("remote page has no id")]
    MissingId,
    #[error("remote page {0} has no properties object")]
    MissingProperties(String),
}

/// One decoded remote property
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichTextSpan>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichTextSpan>,
    },
    Select {
        #[serde(default)]
        select: Option<SelectOption>,
    },
    Status {
        #[serde(default)]
        status: Option<SelectOption>,
    },
    MultiSelect {
        #[serde(default)]
        multi_select: Vec<SelectOption>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    Date {
        #[serde(default)]
        date: Option<DateRange>,
    },
    Relation {
        #[serde(default)]
        relation: Vec<RelationRef>,
    },
    PhoneNumber {
        #[serde(default)]
        phone_number: Option<String>,
    },
    Email {
        #[serde(default)]
        email: Option<String>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RichTextSpan {
    #[serde(default)]
    pub plain_text: Option<String>,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationRef {
    pub id: String,
}

impl RichTextSpan {
    fn as_text(&self) -> &str {
        self.plain_text
            .as_deref()
            .or_else(|| self.text.as_ref().map(|text| text.content.as_str()))
            .unwrap_or("")
    }
}

fn join_spans(spans: &[RichTextSpan]) -> String {
    spans.iter().map(RichTextSpan::as_text).collect::<String>()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse the calendar day out of a remote date string.
///
/// Accepts both `2024-03-11` and full timestamps such as
/// `2024-03-11T10:00:00.000+05:30`; the day as written is kept.
#[must_use]
pub fn parse_remote_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// The raw property map of one remote page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag(Map<String, Value>);

impl PropertyBag {
    #[must_use]
    pub const fn new(raw: Map<String, Value>) -> Self {
        Self(raw)
    }

    /// Decode a single property; `None` when absent or malformed.
    ///
    /// Values without a `type` tag (as written by [`write`]) are tagged from
    /// their payload key.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        let mut raw = self.0.get(name)?.clone();
        if let Value::Object(object) = &mut raw {
            if !object.contains_key("type") {
                let shape = SHAPES.iter().find(|shape| object.contains_key(**shape))?;
                object.insert("type".to_string(), Value::String((*shape).to_string()));
            }
        }
        serde_json::from_value(raw).ok()
    }

    /// Try each alias in priority order, returning the first non-empty extraction
    fn first<T>(&self, aliases: &[&str], extract: impl Fn(PropertyValue) -> Option<T>) -> Option<T> {
        aliases
            .iter()
            .filter_map(|name| self.get(name))
            .find_map(extract)
    }

    /// Text content of a title, rich text, select, phone, or email property
    #[must_use]
    pub fn text(&self, aliases: &[&str]) -> String {
        self.first(aliases, |value| match value {
            PropertyValue::Title { title: spans } | PropertyValue::RichText { rich_text: spans } => {
                non_empty(&join_spans(&spans))
            }
            PropertyValue::Select { select: option } | PropertyValue::Status { status: option } => {
                option.and_then(|option| non_empty(&option.name))
            }
            PropertyValue::PhoneNumber { phone_number: text } | PropertyValue::Email { email: text } => {
                text.as_deref().and_then(non_empty)
            }
            _ => None,
        })
        .unwrap_or_default()
    }

    /// Name of the selected option of a select or status property
    #[must_use]
    pub fn select(&self, aliases: &[&str]) -> Option<String> {
        self.first(aliases, |value| match value {
            PropertyValue::Select { select: option } | PropertyValue::Status { status: option } => {
                option.and_then(|option| non_empty(&option.name))
            }
            _ => None,
        })
    }

    #[must_use]
    pub fn select_or(&self, aliases: &[&str], default: &str) -> String {
        self.select(aliases).unwrap_or_else(|| default.to_string())
    }

    /// Option names of a multi-select property, in remote order, without duplicates
    #[must_use]
    pub fn multi_select(&self, aliases: &[&str]) -> Vec<String> {
        self.first(aliases, |value| match value {
            PropertyValue::MultiSelect { multi_select } => {
                let mut names: Vec<String> = Vec::with_capacity(multi_select.len());
                for name in multi_select.iter().filter_map(|option| non_empty(&option.name)) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                (!names.is_empty()).then_some(names)
            }
            _ => None,
        })
        .unwrap_or_default()
    }

    /// Value of the first checkbox property present
    #[must_use]
    pub fn checkbox(&self, aliases: &[&str]) -> bool {
        self.first(aliases, |value| match value {
            PropertyValue::Checkbox { checkbox } => Some(checkbox),
            _ => None,
        })
        .unwrap_or(false)
    }

    /// Start day of a date property
    #[must_use]
    pub fn date(&self, aliases: &[&str]) -> Option<NaiveDate> {
        self.first(aliases, |value| match value {
            PropertyValue::Date { date } => date
                .and_then(|range| range.start)
                .and_then(|start| parse_remote_date(&start)),
            _ => None,
        })
    }

    /// Identifiers of related pages
    #[must_use]
    pub fn relation_ids(&self, aliases: &[&str]) -> Vec<String> {
        self.first(aliases, |value| match value {
            PropertyValue::Relation { relation } => {
                let ids = relation
                    .into_iter()
                    .filter_map(|reference| non_empty(&reference.id))
                    .collect::<Vec<_>>();
                (!ids.is_empty()).then_some(ids)
            }
            _ => None,
        })
        .unwrap_or_default()
    }

    #[must_use]
    pub fn first_relation(&self, aliases: &[&str]) -> Option<String> {
        self.relation_ids(aliases).into_iter().next()
    }

    #[must_use]
    pub fn phone(&self, aliases: &[&str]) -> String {
        self.first(aliases, |value| match value {
            PropertyValue::PhoneNumber { phone_number } => phone_number.as_deref().and_then(non_empty),
            PropertyValue::RichText { rich_text } => non_empty(&join_spans(&rich_text)),
            _ => None,
        })
        .unwrap_or_default()
    }

    #[must_use]
    pub fn email(&self, aliases: &[&str]) -> String {
        self.first(aliases, |value| match value {
            PropertyValue::Email { email } => email.as_deref().and_then(non_empty),
            PropertyValue::RichText { rich_text } => non_empty(&join_spans(&rich_text)),
            _ => None,
        })
        .unwrap_or_default()
    }

    #[must_use]
    pub fn number(&self, aliases: &[&str]) -> Option<f64> {
        self.first(aliases, |value| match value {
            PropertyValue::Number { number } => number.filter(|number| number.is_finite()),
            _ => None,
        })
    }
}

/// A page as returned by the remote bulk query
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePage {
    pub id: String,
    /// Archived or trashed pages count as deleted remotely
    pub archived: bool,
    /// Creation time (Unix ms), when the remote reported one
    pub created_at: Option<i64>,
    /// Last edit time (Unix ms), when the remote reported one
    pub last_edited_at: Option<i64>,
    pub properties: PropertyBag,
}

impl TryFrom<Value> for RemotePage {
    type Error = MappingError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut object) = value else {
            return Err(MappingError::NotAnObject);
        };

        let id = object
            .get("id")
            .and_then(Value::as_str)
            .and_then(non_empty)
            .ok_or(MappingError::MissingId)?;

        let flag = |name: &str| object.get(name).and_then(Value::as_bool).unwrap_or(false);
        let archived = flag("archived") || flag("in_trash");
        let timestamp = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|parsed| parsed.timestamp_millis())
        };
        let created_at = timestamp("created_time");
        let last_edited_at = timestamp("last_edited_time");

        let Some(Value::Object(properties)) = object.remove("properties") else {
            return Err(MappingError::MissingProperties(id));
        };

        Ok(Self {
            id,
            archived,
            created_at,
            last_edited_at,
            properties: PropertyBag::new(properties),
        })
    }
}

/// Builders for outgoing property values
pub mod write {
    use super::{json, NaiveDate, Value, RICH_TEXT_SPAN_LIMIT};

    fn spans(text: &str) -> Vec<Value> {
        let chars = text.chars().collect::<Vec<_>>();
        chars
            .chunks(RICH_TEXT_SPAN_LIMIT)
            .map(|chunk| json!({ "text": { "content": chunk.iter().collect::<String>() } }))
            .collect()
    }

    #[must_use]
    pub fn title(text: &str) -> Value {
        json!({ "title": spans(text) })
    }

    #[must_use]
    pub fn rich_text(text: &str) -> Value {
        json!({ "rich_text": spans(text) })
    }

    #[must_use]
    pub fn select(name: Option<&str>) -> Value {
        match name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => json!({ "select": { "name": name } }),
            None => json!({ "select": null }),
        }
    }

    #[must_use]
    pub fn multi_select(names: &[String]) -> Value {
        let options = names
            .iter()
            .map(|name| json!({ "name": name }))
            .collect::<Vec<_>>();
        json!({ "multi_select": options })
    }

    #[must_use]
    pub fn checkbox(checked: bool) -> Value {
        json!({ "checkbox": checked })
    }

    #[must_use]
    pub fn date(day: Option<NaiveDate>) -> Value {
        match day {
            Some(day) => json!({ "date": { "start": day.format("%Y-%m-%d").to_string() } }),
            None => json!({ "date": null }),
        }
    }

    #[must_use]
    pub fn relation(ids: &[&str]) -> Value {
        let refs = ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>();
        json!({ "relation": refs })
    }

    #[must_use]
    pub fn phone_number(phone: &str) -> Value {
        let phone = phone.trim();
        if phone.is_empty() {
            json!({ "phone_number": null })
        } else {
            json!({ "phone_number": phone })
        }
    }

    #[must_use]
    pub fn email(email: &str) -> Value {
        let email = email.trim();
        if email.is_empty() {
            json!({ "email": null })
        } else {
            json!({ "email": email })
        }
    }

    #[must_use]
    pub fn number(value: Option<f64>) -> Value {
        json!({ "number": value.filter(|value| value.is_finite()) })
    }
}
