/*!
 * Field specifications and value validation.
 *
 * A `FieldSpec` describes one column of a shared or translation model and
 * doubles as the serializer field generated for it. Validation follows the
 * conventions REST clients already know: one list of messages per field,
 * required/null/blank checks first, then type conversion, then length.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use url::Url;

/// Message used when a required value is missing
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Message used when `null` is not accepted
pub const NULL_MESSAGE: &str = "This field may not be null.";

/// Message used when an empty string is not accepted
pub const BLANK_MESSAGE: &str = "This field may not be blank.";

/// URL schemes accepted by `FieldKind::Url`
const URL_SCHEMES: [&str; 4] = ["http", "https", "ftp", "ftps"];

/// Value type of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text
    Char,
    /// Absolute http(s)/ftp(s) URL stored as text
    Url,
    /// Signed 64-bit integer
    Integer,
    /// Floating point number
    Float,
    /// Boolean flag
    Boolean,
    /// Text restricted to a fixed set of values
    Choice(Vec<String>),
}

impl FieldKind {
    /// Whether values of this kind are strings
    pub fn is_text(&self) -> bool {
        matches!(self, FieldKind::Char | FieldKind::Url | FieldKind::Choice(_))
    }
}

/// Declaration of a single model field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field (and column) name
    pub name: String,

    /// Value type
    #[serde(rename = "type")]
    pub kind: FieldKind,

    /// Maximum number of characters for text kinds
    #[serde(default)]
    pub max_length: Option<usize>,

    /// Whether the field may be omitted or left empty
    #[serde(default)]
    pub blank: bool,

    /// Whether `null` is an accepted value
    #[serde(default)]
    pub null: bool,

    /// Whether the column carries a UNIQUE constraint
    #[serde(default)]
    pub unique: bool,

    /// Whether the field is only ever serialized
    #[serde(default)]
    pub read_only: bool,

    /// Value used when the field is omitted on create
    #[serde(default)]
    pub default: Option<Value>,
}

impl FieldSpec {
    /// Create a field of the given kind with no constraints
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            max_length: None,
            blank: false,
            null: false,
            unique: false,
            read_only: false,
            default: None,
        }
    }

    /// Text field with a maximum length
    pub fn char(name: impl Into<String>, max_length: usize) -> Self {
        Self::new(name, FieldKind::Char).with_max_length(max_length)
    }

    /// URL field with a maximum length
    pub fn url(name: impl Into<String>, max_length: usize) -> Self {
        Self::new(name, FieldKind::Url).with_max_length(max_length)
    }

    /// Integer field
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    /// Float field
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    /// Boolean field
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// Choice field over the given values
    pub fn choice(name: impl Into<String>, choices: Vec<String>) -> Self {
        Self::new(name, FieldKind::Choice(choices))
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Allow the field to be omitted or blank
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether input data must contain this field on create
    pub fn is_required(&self) -> bool {
        !self.read_only && !self.blank && !self.null && self.default.is_none()
    }

    /// Value stored when a row is written without this field
    pub fn empty_value(&self) -> Value {
        if let Some(default) = &self.default {
            return default.clone();
        }
        if self.kind.is_text() && !self.null {
            return Value::String(String::new());
        }
        Value::Null
    }

    /// Validate a raw input value
    ///
    /// `None` means the key was absent. Returns `Ok(None)` when the field
    /// contributes nothing to the validated data (read-only, or optional and
    /// absent), otherwise the converted value.
    pub fn validate(&self, value: Option<&Value>, partial: bool) -> Result<Option<Value>, Vec<String>> {
        if self.read_only {
            return Ok(None);
        }

        let value = match value {
            None => {
                if partial {
                    return Ok(None);
                }
                if self.is_required() {
                    return Err(vec![REQUIRED_MESSAGE.to_string()]);
                }
                return Ok(self.default.clone());
            }
            Some(Value::Null) => {
                if self.null {
                    return Ok(Some(Value::Null));
                }
                return Err(vec![NULL_MESSAGE.to_string()]);
            }
            Some(value) => value,
        };

        let converted = match &self.kind {
            FieldKind::Char => self.to_text(value)?,
            FieldKind::Url => {
                let text = self.to_text(value)?;
                if let Value::String(s) = &text {
                    if !s.is_empty() && !is_valid_url(s) {
                        return Err(vec!["Enter a valid URL.".to_string()]);
                    }
                }
                text
            }
            FieldKind::Choice(choices) => {
                let display = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let text = self.to_text(value)?;
                if let Value::String(s) = &text {
                    if !(s.is_empty() && self.blank) && !choices.iter().any(|c| c == s) {
                        return Err(vec![format!("\"{}\" is not a valid choice.", display)]);
                    }
                }
                text
            }
            FieldKind::Integer => Value::Number(to_integer(value)?.into()),
            FieldKind::Float => to_float(value)?,
            FieldKind::Boolean => Value::Bool(to_boolean(value)?),
        };

        Ok(Some(converted))
    }

    /// Convert to a trimmed string and apply blank and length checks
    fn to_text(&self, value: &Value) -> Result<Value, Vec<String>> {
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return Err(vec!["Not a valid string.".to_string()]),
        };

        if text.is_empty() {
            if !self.blank {
                return Err(vec![BLANK_MESSAGE.to_string()]);
            }
            return Ok(Value::String(text));
        }

        if let Some(max_length) = self.max_length {
            if text.chars().count() > max_length {
                return Err(vec![format!(
                    "Ensure this field has no more than {} characters.",
                    max_length
                )]);
            }
        }

        Ok(Value::String(text))
    }
}

/// Check that a string is an absolute URL with an accepted scheme and a host
pub fn is_valid_url(candidate: &str) -> bool {
    let Ok(parsed) = Url::parse(candidate) else {
        return false;
    };
    if !URL_SCHEMES.contains(&parsed.scheme()) {
        return false;
    }
    match parsed.host() {
        Some(url::Host::Domain(domain)) => domain == "localhost" || domain.contains('.'),
        Some(_) => true,
        None => false,
    }
}

fn to_integer(value: &Value) -> Result<i64, Vec<String>> {
    let invalid = || vec!["A valid integer is required.".to_string()];
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                    _ => Err(invalid()),
                }
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let trimmed = match trimmed.split_once('.') {
                Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
                _ => trimmed,
            };
            trimmed.parse::<i64>().map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

fn to_float(value: &Value) -> Result<Value, Vec<String>> {
    let invalid = || vec!["A valid number is required.".to_string()];
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(invalid)
}

fn to_boolean(value: &Value) -> Result<bool, Vec<String>> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(vec!["Must be a valid boolean.".to_string()]),
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(false),
            _ => Err(vec!["Must be a valid boolean.".to_string()]),
        },
        _ => Err(vec!["Must be a valid boolean.".to_string()]),
    }
}
