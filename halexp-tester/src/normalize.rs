//! Response classification and normalization
//!
//! The search service returns two record shapes inside the same `reponses`
//! envelope. Records are first classified by shape into [`RawResult`], then
//! projected onto a display-ready [`ResultItem`].
//!
//! Classification inspects the record itself, never the declared query mode:
//! upstream responses are not guaranteed to match what was asked for.

use halexp_common::events::ResultItem;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Display-name fields marking an author-shaped record, in lookup order
const AUTHOR_NAME_FIELDS: [&str; 2] = ["author_name", "name"];

/// Person-identifier fields of author-shaped records, in lookup order
const AUTHOR_ID_FIELDS: [&str; 3] = ["author_id-hal", "id-hal", "id_hal"];

/// Unexpected response shape
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ShapeError {
    #[error("Response is missing the 'reponses' list")]
    MissingEnvelope,

    #[error("Result #{rank} matches neither the author nor the document shape")]
    UnknownShape { rank: usize },

    #[error("Result #{rank} ({shape}) is missing field '{field}'")]
    MissingField {
        rank: usize,
        shape: &'static str,
        field: &'static str,
    },
}

#[derive(Deserialize)]
struct Envelope {
    // Spelling fixed by the service
    reponses: Vec<Value>,
}

/// Extract the result list from a response body
pub fn extract_results(body: Value) -> Result<Vec<Value>, ShapeError> {
    serde_json::from_value::<Envelope>(body)
        .map(|envelope| envelope.reponses)
        .map_err(|_| ShapeError::MissingEnvelope)
}

/// A raw record classified by shape
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Author { name: String, id_hal: String },
    Document { title: String, uri: String },
}

impl RawResult {
    pub fn shape(&self) -> &'static str {
        match self {
            RawResult::Author { .. } => "author",
            RawResult::Document { .. } => "document",
        }
    }
}

/// Classify one raw record
///
/// A display-name field selects the author shape; otherwise the record
/// must carry `title_s` and `uri_s`.
pub fn classify(record: &Value, rank: usize) -> Result<RawResult, ShapeError> {
    if let Some(name) = first_text(record, &AUTHOR_NAME_FIELDS) {
        let id_hal = first_text(record, &AUTHOR_ID_FIELDS).ok_or(ShapeError::MissingField {
            rank,
            shape: "author",
            field: AUTHOR_ID_FIELDS[0],
        })?;
        return Ok(RawResult::Author { name, id_hal });
    }

    let title = text_field(record.get("title_s"));
    let uri = text_field(record.get("uri_s"));
    match (title, uri) {
        (Some(title), Some(uri)) => Ok(RawResult::Document { title, uri }),
        (None, None) => Err(ShapeError::UnknownShape { rank }),
        (None, Some(_)) => Err(ShapeError::MissingField {
            rank,
            shape: "document",
            field: "title_s",
        }),
        (Some(_), None) => Err(ShapeError::MissingField {
            rank,
            shape: "document",
            field: "uri_s",
        }),
    }
}

/// Author profile link builder
#[derive(Debug, Clone)]
pub struct ProfileLink {
    template: String,
}

impl ProfileLink {
    /// `template` must contain an `{id}` placeholder
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn for_author(&self, id_hal: &str) -> String {
        self.template.replace("{id}", id_hal)
    }
}

impl Default for ProfileLink {
    fn default() -> Self {
        Self::new(halexp_common::config::DEFAULT_PROFILE_URL_TEMPLATE)
    }
}

/// Project a classified record onto a display-ready item
pub fn normalize(raw: &RawResult, key: DetailKey, profile: &ProfileLink) -> ResultItem {
    let (label, link_url) = match raw {
        RawResult::Author { name, id_hal } => (name.clone(), profile.for_author(id_hal)),
        RawResult::Document { title, uri } => (title.clone(), uri.clone()),
    };
    ResultItem {
        label,
        link_url,
        detail_key: key.to_string(),
    }
}

/// Position of one result: configuration row and rank within the row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetailKey {
    pub config_index: usize,
    pub rank: usize,
}

impl DetailKey {
    pub fn new(config_index: usize, rank: usize) -> Self {
        Self { config_index, rank }
    }
}

impl fmt::Display for DetailKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.config_index, self.rank)
    }
}

impl FromStr for DetailKey {
    type Err = halexp_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || halexp_common::Error::InvalidInput(format!("Invalid detail key '{}'", s));
        let (index, rank) = s.split_once('#').ok_or_else(invalid)?;
        Ok(Self {
            config_index: index.parse().map_err(|_| invalid())?,
            rank: rank.parse().map_err(|_| invalid())?,
        })
    }
}

fn first_text(record: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|f| text_field(record.get(*f)))
}

/// Non-empty string (or numeric) value, or first string of an array
///
/// HAL returns `_s` fields both as scalars and as single-element arrays.
/// An empty string counts as absent, so `{"author_name": ""}` is not an
/// author record.
fn text_field(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.first().and_then(Value::as_str)?.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
