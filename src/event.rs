use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Severity of a [`LogEvent`], ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        };
        f.write_str(name)
    }
}

/// Error returned when an event or one of its properties is malformed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("invalid property name {0:?}: names must not be blank")]
    InvalidPropertyName(String),

    #[error("property name {0:?} is reserved for the structure type tag")]
    ReservedFieldName(String),
}

/// Key a structure's type tag is serialized under, next to its fields.
pub const TYPE_TAG_KEY: &str = "$type";

/// Property names must contain at least one non-whitespace character.
pub fn is_valid_property_name(name: &str) -> bool {
    !name.trim().is_empty()
}

/// Immutable message template, shared between copies of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageTemplate(Arc<str>);

impl MessageTemplate {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        MessageTemplate(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// Render the template against a property mapping.
    ///
    /// `{Name}` holes are replaced with the display form of the matching
    /// property (format specifiers after `:` or `,` are ignored), `{{` and
    /// `}}` produce literal braces, and holes naming an absent property are
    /// left untouched.
    pub fn render(&self, properties: &BTreeMap<String, PropertyValue>) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest: &str = &self.0;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('{') {
                match tail.find('}') {
                    Some(end) => {
                        let hole = &tail[1..end];
                        let name = hole.split([':', ',']).next().unwrap_or(hole);
                        match properties.get(name) {
                            Some(value) => out.push_str(&value.to_string()),
                            None => out.push_str(&tail[..=end]),
                        }
                        rest = &tail[end + 1..];
                    }
                    None => {
                        out.push_str(tail);
                        rest = "";
                    }
                }
            } else {
                out.push('}');
                rest = &tail[1..];
            }
        }

        out.push_str(rest);
        out
    }
}

impl From<&str> for MessageTemplate {
    fn from(text: &str) -> Self {
        MessageTemplate::new(text)
    }
}

impl From<String> for MessageTemplate {
    fn from(text: String) -> Self {
        MessageTemplate::new(text)
    }
}

impl fmt::Display for MessageTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for MessageTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Leaf value of a property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("null"),
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::I64(v) => write!(f, "{v}"),
            ScalarValue::U64(v) => write!(f, "{v}"),
            ScalarValue::F64(v) => write!(f, "{v}"),
            ScalarValue::String(v) => f.write_str(v),
        }
    }
}

/// Named group of properties, optionally tagged with the type it was
/// captured from.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Structure {
    #[serde(rename = "$type", skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Structure {
    pub fn new(type_tag: Option<String>) -> Self {
        Structure {
            type_tag,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<Self, EventError> {
        let name = name.into();
        validate_field_name(&name)?;
        self.properties.insert(name, value.into());
        Ok(self)
    }
}

// Structure fields share a JSON object with the type tag.
fn validate_field_name(name: &str) -> Result<(), EventError> {
    if !is_valid_property_name(name) {
        return Err(EventError::InvalidPropertyName(name.to_string()));
    }
    if name == TYPE_TAG_KEY {
        return Err(EventError::ReservedFieldName(name.to_string()));
    }
    Ok(())
}

/// Value carried by an event property.
///
/// Every variant owns its data outright, so `clone()` is a full structural
/// copy and no two events ever share a mutable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Scalar(ScalarValue),
    Sequence(Vec<PropertyValue>),
    Structure(Structure),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Scalar(v) => write!(f, "{v}"),
            PropertyValue::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            PropertyValue::Structure(s) => {
                if let Some(tag) = &s.type_tag {
                    write!(f, "{tag} ")?;
                }
                f.write_str("{ ")?;
                for (i, (name, value)) in s.properties.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

macro_rules! scalar_from {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for ScalarValue {
                fn from(v: $ty) -> Self {
                    ScalarValue::$variant(v.into())
                }
            }

            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    PropertyValue::Scalar(ScalarValue::from(v))
                }
            }
        )+
    };
}

scalar_from!(Bool: bool);
scalar_from!(I64: i8, i16, i32, i64);
scalar_from!(U64: u8, u16, u32, u64);
scalar_from!(F64: f32, f64);
scalar_from!(String: &str, String);

impl From<ScalarValue> for PropertyValue {
    fn from(v: ScalarValue) -> Self {
        PropertyValue::Scalar(v)
    }
}

impl From<Structure> for PropertyValue {
    fn from(v: Structure) -> Self {
        PropertyValue::Structure(v)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        PropertyValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// Snapshot of an error captured alongside an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    /// Messages of the `source()` chain, outermost first.
    pub sources: Vec<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorInfo {
            message: message.into(),
            sources: Vec::new(),
        }
    }

    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut next = err.source();
        while let Some(source) = next {
            sources.push(source.to_string());
            next = source.source();
        }
        ErrorInfo {
            message: err.to_string(),
            sources,
        }
    }
}

/// One log occurrence flowing through the sink pipeline.
///
/// The template and exception are immutable and shared by reference when the
/// event is cloned; the property mapping is owned by each instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message_template: MessageTemplate,
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<Arc<ErrorInfo>>,
}

impl LogEvent {
    pub fn new(level: LogLevel, template: impl Into<MessageTemplate>) -> Self {
        LogEvent {
            timestamp: Utc::now(),
            level,
            message_template: template.into(),
            properties: BTreeMap::new(),
            exception: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_exception(mut self, exception: ErrorInfo) -> Self {
        self.exception = Some(Arc::new(exception));
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<Self, EventError> {
        self.add_or_update_property(name, value)?;
        Ok(self)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn contains_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Insert or replace a property, returning the previous value.
    pub fn add_or_update_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<Option<PropertyValue>, EventError> {
        let name = name.into();
        if !is_valid_property_name(&name) {
            return Err(EventError::InvalidPropertyName(name));
        }
        Ok(self.properties.insert(name, value.into()))
    }

    /// Insert a property unless one with the same name exists. Returns
    /// whether the property was added.
    pub fn add_property_if_absent(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<bool, EventError> {
        let name = name.into();
        if !is_valid_property_name(&name) {
            return Err(EventError::InvalidPropertyName(name));
        }
        if self.properties.contains_key(&name) {
            return Ok(false);
        }
        self.properties.insert(name, value.into());
        Ok(true)
    }

    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.remove(name)
    }

    /// Check every property name, including names nested inside structured
    /// values.
    pub fn validate(&self) -> Result<(), EventError> {
        for (name, value) in &self.properties {
            if !is_valid_property_name(name) {
                return Err(EventError::InvalidPropertyName(name.clone()));
            }
            validate_value(value)?;
        }
        Ok(())
    }

    pub fn render_message(&self) -> String {
        self.message_template.render(&self.properties)
    }
}

fn validate_fields(fields: &BTreeMap<String, PropertyValue>) -> Result<(), EventError> {
    for (name, value) in fields {
        validate_field_name(name)?;
        validate_value(value)?;
    }
    Ok(())
}

fn validate_value(value: &PropertyValue) -> Result<(), EventError> {
    match value {
        PropertyValue::Scalar(_) => Ok(()),
        PropertyValue::Sequence(items) => items.iter().try_for_each(validate_value),
        PropertyValue::Structure(s) => validate_fields(&s.properties),
    }
}
