//! Property value kinds
//!
//! The set of storable kinds is closed: [`PropertyValue`] is sealed and
//! implemented for `i32`, `f64`, `bool`, `String` and vectors of the numeric
//! and string kinds. Every kind has a canonical text form that round-trips
//! through [`PropertyValue::parse_text`].
//!
//! Sequences are written comma-separated. On parse each token is trimmed and
//! empty tokens are dropped, so `"1, 2,,3"` reads as `[1, 2, 3]`.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Type tag of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// 32-bit signed integer
    Int,
    /// 64-bit float
    Double,
    /// Boolean flag
    Bool,
    /// Free text
    String,
    /// Ordered sequence of integers
    IntArray,
    /// Ordered sequence of floats
    DoubleArray,
    /// Ordered sequence of strings
    StringArray,
}

impl ValueKind {
    /// Short human-readable type name shown to users
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Int | Self::Double => "number",
            Self::Bool => "boolean",
            Self::String => "string",
            Self::IntArray => "int list",
            Self::DoubleArray => "dbl list",
            Self::StringArray => "str list",
        }
    }

    /// Check if kind is a sequence
    #[inline]
    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(self, Self::IntArray | Self::DoubleArray | Self::StringArray)
    }

    /// Check if kind is numeric (scalar or sequence)
    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Double | Self::IntArray | Self::DoubleArray
        )
    }
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Int => "int",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::IntArray => "int array",
            Self::DoubleArray => "double array",
            Self::StringArray => "string array",
        };
        f.write_str(label)
    }
}

/// A value of any supported kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// 32-bit integer
    Int(i32),
    /// Double-precision float
    Double(f64),
    /// Boolean, `1`/`0` in text form
    Bool(bool),
    /// Free text, kept verbatim
    String(String),
    /// Integer list
    IntArray(Vec<i32>),
    /// Float list
    DoubleArray(Vec<f64>),
    /// Text list; elements that would not survive the bare form are quoted
    StringArray(Vec<String>),
}

impl Value {
    /// Kind tag of this value
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Bool(_) => ValueKind::Bool,
            Self::String(_) => ValueKind::String,
            Self::IntArray(_) => ValueKind::IntArray,
            Self::DoubleArray(_) => ValueKind::DoubleArray,
            Self::StringArray(_) => ValueKind::StringArray,
        }
    }

    /// Parse text as the given kind
    ///
    /// # Errors
    /// Returns the parser's diagnostic if the text is not a valid `kind`
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self, String> {
        Ok(match kind {
            ValueKind::Int => Self::Int(i32::parse_text(text)?),
            ValueKind::Double => Self::Double(f64::parse_text(text)?),
            ValueKind::Bool => Self::Bool(bool::parse_text(text)?),
            ValueKind::String => Self::String(String::parse_text(text)?),
            ValueKind::IntArray => Self::IntArray(Vec::<i32>::parse_text(text)?),
            ValueKind::DoubleArray => Self::DoubleArray(Vec::<f64>::parse_text(text)?),
            ValueKind::StringArray => Self::StringArray(Vec::<String>::parse_text(text)?),
        })
    }

    /// Canonical text form
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Int(v) => v.to_text(),
            Self::Double(v) => v.to_text(),
            Self::Bool(v) => v.to_text(),
            Self::String(v) => v.to_text(),
            Self::IntArray(v) => v.to_text(),
            Self::DoubleArray(v) => v.to_text(),
            Self::StringArray(v) => v.to_text(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

pub(crate) mod private {
    pub trait Sealed {}

    impl Sealed for i32 {}
    impl Sealed for f64 {}
    impl Sealed for bool {}
    impl Sealed for String {}
    impl Sealed for Vec<i32> {}
    impl Sealed for Vec<f64> {}
    impl Sealed for Vec<String> {}
}

/// A Rust type that can be stored in a property
///
/// Sealed: the supported set is fixed by this crate.
pub trait PropertyValue:
    private::Sealed + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Kind tag for this type
    const KIND: ValueKind;

    /// Parse the canonical (or a tolerated) text form
    ///
    /// # Errors
    /// Returns a diagnostic describing why the text is not a valid value
    fn parse_text(text: &str) -> Result<Self, String>;

    /// Canonical text form
    fn to_text(&self) -> String;

    /// Wrap into the dynamic [`Value`]
    fn into_value(self) -> Value;

    /// Unwrap from the dynamic [`Value`], `None` if the kind differs
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! value_conversions {
    ($variant:ident) => {
        fn into_value(self) -> Value {
            Value::$variant(self)
        }

        fn from_value(value: Value) -> Option<Self> {
            match value {
                Value::$variant(v) => Some(v),
                _ => None,
            }
        }
    };
}

impl PropertyValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn parse_text(text: &str) -> Result<Self, String> {
        text.trim().parse().map_err(|e: std::num::ParseIntError| e.to_string())
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    value_conversions!(Int);
}

impl PropertyValue for f64 {
    const KIND: ValueKind = ValueKind::Double;

    fn parse_text(text: &str) -> Result<Self, String> {
        text.trim()
            .parse()
            .map_err(|e: std::num::ParseFloatError| e.to_string())
    }

    // `Display` for f64 is the shortest form that parses back to the same bits
    fn to_text(&self) -> String {
        self.to_string()
    }

    value_conversions!(Double);
}

impl PropertyValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn parse_text(text: &str) -> Result<Self, String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err("expected 1, 0, true or false".to_string()),
        }
    }

    fn to_text(&self) -> String {
        String::from(if *self { "1" } else { "0" })
    }

    value_conversions!(Bool);
}

impl PropertyValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn parse_text(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    value_conversions!(String);
}

fn parse_list<T>(
    text: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    text.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| parse(token).map_err(|e| format!("element \"{token}\": {e}")))
        .collect()
}

fn format_list<T>(items: &[T], format: impl Fn(&T) -> String) -> String {
    items.iter().map(format).collect::<Vec<_>>().join(",")
}

impl PropertyValue for Vec<i32> {
    const KIND: ValueKind = ValueKind::IntArray;

    fn parse_text(text: &str) -> Result<Self, String> {
        parse_list(text, i32::parse_text)
    }

    fn to_text(&self) -> String {
        format_list(self, i32::to_text)
    }

    value_conversions!(IntArray);
}

impl PropertyValue for Vec<f64> {
    const KIND: ValueKind = ValueKind::DoubleArray;

    fn parse_text(text: &str) -> Result<Self, String> {
        parse_list(text, f64::parse_text)
    }

    fn to_text(&self) -> String {
        format_list(self, f64::to_text)
    }

    value_conversions!(DoubleArray);
}

impl PropertyValue for Vec<String> {
    const KIND: ValueKind = ValueKind::StringArray;

    /// Bare tokens are trimmed and empty ones dropped, like the numeric
    /// lists. A token starting with `"` is taken verbatim up to the closing
    /// quote, with `\` escaping the next character.
    fn parse_text(text: &str) -> Result<Self, String> {
        let mut items = Vec::new();
        let mut chars = text.chars().peekable();
        loop {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            match chars.peek() {
                None => break,
                Some('"') => {
                    chars.next();
                    let mut item = String::new();
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some('\\') => match chars.next() {
                                Some(c) => item.push(c),
                                None => return Err(format!("unterminated quote in \"{text}\"")),
                            },
                            Some(c) => item.push(c),
                            None => return Err(format!("unterminated quote in \"{text}\"")),
                        }
                    }
                    while chars.next_if(|c| c.is_whitespace()).is_some() {}
                    match chars.next() {
                        None | Some(',') => {}
                        Some(c) => {
                            return Err(format!("element \"{item}\": unexpected '{c}' after quote"))
                        }
                    }
                    items.push(item);
                }
                Some(_) => {
                    let mut token = String::new();
                    while let Some(c) = chars.next_if(|c| *c != ',') {
                        token.push(c);
                    }
                    chars.next();
                    let token = token.trim();
                    if !token.is_empty() {
                        items.push(token.to_string());
                    }
                }
            }
        }
        Ok(items)
    }

    fn to_text(&self) -> String {
        format_list(self, |item| quote_if_needed(item))
    }

    value_conversions!(StringArray);
}

// Quote elements the bare form would split, trim or drop
fn quote_if_needed(item: &str) -> String {
    let bare = !item.is_empty()
        && item.trim() == item
        && !item.contains([',', '"', '\\']);
    if bare {
        return item.to_string();
    }
    let mut quoted = String::with_capacity(item.len() + 2);
    quoted.push('"');
    for c in item.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parse_tolerates_whitespace() {
        assert_eq!(i32::parse_text(" 42 "), Ok(42));
        assert!(i32::parse_text("not-a-number").is_err());
        assert!(i32::parse_text("").is_err());
    }

    #[test]
    fn double_text_is_shortest_form() {
        assert_eq!(60.0_f64.to_text(), "60");
        assert_eq!(1.5_f64.to_text(), "1.5");
        assert_eq!(f64::parse_text("60"), Ok(60.0));
    }

    #[test]
    fn bool_accepts_words_and_digits() {
        assert_eq!(bool::parse_text("TRUE"), Ok(true));
        assert_eq!(bool::parse_text("0"), Ok(false));
        assert!(bool::parse_text("yes").is_err());
        assert_eq!(true.to_text(), "1");
    }

    #[test]
    fn string_is_verbatim() {
        assert_eq!(String::parse_text("  padded "), Ok("  padded ".to_string()));
    }

    #[test]
    fn list_drops_empty_tokens() {
        assert_eq!(Vec::<i32>::parse_text("1, 2,,3,"), Ok(vec![1, 2, 3]));
        assert_eq!(Vec::<f64>::parse_text(""), Ok(Vec::new()));
        assert_eq!(
            Vec::<String>::parse_text("SpeedRequest1, Speed1 ,frequency"),
            Ok(vec![
                "SpeedRequest1".to_string(),
                "Speed1".to_string(),
                "frequency".to_string()
            ])
        );
    }

    #[test]
    fn awkward_strings_are_quoted() {
        let items = vec![
            "a,b".to_string(),
            " c".to_string(),
            String::new(),
            r#"say "hi" \ bye"#.to_string(),
            "plain".to_string(),
        ];
        let text = items.to_text();
        assert_eq!(text, r#""a,b"," c","","say \"hi\" \\ bye",plain"#);
        assert_eq!(Vec::<String>::parse_text(&text), Ok(items));
    }

    #[test]
    fn quoted_elements_mix_with_bare_ones() {
        assert_eq!(
            Vec::<String>::parse_text(r#" x , "y, z" ,w,"#),
            Ok(vec!["x".to_string(), "y, z".to_string(), "w".to_string()])
        );
        // A quote inside a bare token is literal
        assert_eq!(Vec::<String>::parse_text(r#"a"b"#), Ok(vec![r#"a"b"#.to_string()]));
        assert!(Vec::<String>::parse_text(r#""open"#).is_err());
        assert!(Vec::<String>::parse_text(r#""a" b"#).is_err());
    }

    #[test]
    fn list_reports_bad_element() {
        let err = Vec::<f64>::parse_text("0.1,abc").unwrap_err();
        assert!(err.contains("abc"));
    }

    #[test]
    fn dynamic_value_matches_kind() {
        let value = Value::parse(ValueKind::DoubleArray, "0.31, 0.2").unwrap();
        assert_eq!(value.kind(), ValueKind::DoubleArray);
        assert_eq!(value.to_text(), "0.31,0.2");
        assert_eq!(Vec::<f64>::from_value(value), Some(vec![0.31, 0.2]));
        assert_eq!(i32::from_value(Value::Double(1.0)), None);
    }

    #[test]
    fn type_names() {
        assert_eq!(ValueKind::Int.type_name(), "number");
        assert_eq!(ValueKind::StringArray.type_name(), "str list");
        assert!(ValueKind::IntArray.is_array());
        assert!(!ValueKind::String.is_numeric());
    }
}
