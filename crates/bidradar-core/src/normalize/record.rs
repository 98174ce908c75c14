//! Raw and canonical record types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Which upstream record family a run collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Bid announcements.
    Bid,
    /// Award (opening) results.
    Award,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Bid => "bid",
            RecordKind::Award => "award",
        }
    }

    /// Plural form used in file names.
    pub fn plural(self) -> &'static str {
        match self {
            RecordKind::Bid => "bids",
            RecordKind::Award => "awards",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bid" | "bids" => Ok(RecordKind::Bid),
            "award" | "awards" => Ok(RecordKind::Award),
            other => Err(format!("unknown record kind: {other}")),
        }
    }
}

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    Mock,
    LiveApi,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::Mock => "mock",
            SourceTag::LiveApi => "live-api",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword category of a bid announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Construction,
    Software,
    Services,
    Goods,
    Other,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Construction => "construction",
            Category::Software => "software",
            Category::Services => "services",
            Category::Goods => "goods",
            Category::Other => "other",
        }
    }
}

/// One upstream item: field name to string/number value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build from string pairs (test fixtures, mock sources).
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        )
    }

    /// Field as trimmed text. Numbers are rendered; empty strings, null,
    /// arrays and objects are `None`.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Canonical record. Never exists without an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub identifier: String,
    pub occurred_at: Option<NaiveDateTime>,
    /// Bid submission deadline; always `None` for awards.
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    pub amount: Option<f64>,
    pub count: Option<i64>,
    pub rate: Option<f64>,
    /// Bid title, or the winning company for awards.
    pub title: Option<String>,
    pub agency: Option<String>,
    pub category: Option<Category>,
    pub region: Option<String>,
    pub source_tag: SourceTag,
    pub collected_at: DateTime<Utc>,
}
