//! Front-matter parsing

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while separating and decoding a front-matter block
#[derive(Error, Debug)]
pub enum FrontMatterError {
    #[error("missing front-matter block (the file must start with a `---` or `+++` line)")]
    Missing,

    #[error("unterminated front-matter block: no closing `{0}` line")]
    Unterminated(&'static str),

    #[error("invalid YAML front-matter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML front-matter: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A string, or a number kept as its text (`tags: [2024, rust]`)
struct Scalar(String);

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        string_or_vec(deserializer).and_then(|mut values| match values.len() {
            1 => Ok(Scalar(values.remove(0))),
            _ => Err(serde::de::Error::custom("expected a string or a number")),
        })
    }
}

/// Custom deserializer that handles both a single string and a list of strings
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, SeqAccess, Visitor};
    use std::fmt;

    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value])
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(item) = seq.next_element::<Scalar>()? {
                vec.push(item.0);
            }
            Ok(vec)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

/// Front-matter data from a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "author", deserialize_with = "string_or_vec")]
    pub authors: Vec<String>,
    #[serde(deserialize_with = "string_or_vec")]
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub draft: bool,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    /// Split a post into its front-matter and body.
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), FrontMatterError> {
        let content = content.trim_start_matches('\u{feff}').trim_start();
        let opening = content.lines().next().map(str::trim_end);

        match opening {
            Some("---") => {
                let (block, body) = split_block(content, "---")?;
                Ok((Self::parse_yaml(block)?, body))
            }
            Some("+++") => {
                let (block, body) = split_block(content, "+++")?;
                Ok((Self::parse_toml(block)?, body))
            }
            _ => Err(FrontMatterError::Missing),
        }
    }

    fn parse_yaml(block: &str) -> Result<Self, FrontMatterError> {
        if block.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(block)?)
    }

    fn parse_toml(block: &str) -> Result<Self, FrontMatterError> {
        let table: toml::Table = block.parse()?;
        // TOML has a native datetime type; keep dates as strings like YAML does
        let value = stringify_datetimes(toml::Value::Table(table));
        Ok(value.try_into()?)
    }

    /// Parse the date string into a DateTime
    pub fn parse_date(&self) -> Option<DateTime<FixedOffset>> {
        self.date.as_deref().and_then(parse_date_string)
    }
}

/// Find the closing delimiter line. Returns (block, body).
fn split_block<'a>(
    content: &'a str,
    delimiter: &'static str,
) -> Result<(&'a str, &'a str), FrontMatterError> {
    let rest = match content.find('\n') {
        Some(pos) => &content[pos + 1..],
        None => return Err(FrontMatterError::Unterminated(delimiter)),
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == delimiter {
            let block = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\n', '\r']);
            return Ok((block, body));
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unterminated(delimiter))
}

fn stringify_datetimes(value: toml::Value) -> toml::Value {
    match value {
        toml::Value::Datetime(dt) => toml::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            toml::Value::Array(items.into_iter().map(stringify_datetimes).collect())
        }
        toml::Value::Table(table) => toml::Value::Table(
            table
                .into_iter()
                .map(|(k, v)| (k, stringify_datetimes(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Parse a date string in various formats.
/// Values without an offset are taken as UTC.
pub fn parse_date_string(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();

    // RFC 3339 / ISO 8601 with offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S %z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let utc = FixedOffset::east_opt(0)?;

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, utc));
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            let dt = d.and_hms_opt(0, 0, 0)?;
            return Some(DateTime::from_naive_utc_and_offset(dt, utc));
        }
    }

    None
}
