//! Configuration space construction
//!
//! Expands the four axes of variation (instance, minimum year, score
//! threshold, ranking metric) into the ordered Cartesian product of
//! configurations. Also hosts the permissive text parsing that turns raw
//! form/CLI entries into [`AxisInputs`].

use halexp_common::config::KNOWN_METRICS;
use halexp_common::{Error, QueryMode, Result};
use serde::{Serialize, Serializer};
use std::fmt;

/// Separator between display name components
pub const DISPLAY_NAME_SEPARATOR: &str = " | ";

/// Minimum publication year filter
///
/// `NotANumber` is the sentinel a permissive parse yields for malformed
/// input. It is sent upstream verbatim as `NaN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinYear {
    Year(i32),
    NotANumber,
}

impl fmt::Display for MinYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MinYear::Year(year) => write!(f, "{}", year),
            MinYear::NotANumber => f.write_str("NaN"),
        }
    }
}

impl From<i32> for MinYear {
    fn from(year: i32) -> Self {
        MinYear::Year(year)
    }
}

impl Serialize for MinYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MinYear::Year(year) => serializer.serialize_i32(*year),
            MinYear::NotANumber => serializer.serialize_str("NaN"),
        }
    }
}

/// Validated axis lists plus the per-run query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInputs {
    /// Instance base URLs, each ending in `/`
    pub instances: Vec<String>,
    pub min_years: Vec<MinYear>,
    pub thresholds: Vec<f64>,
    pub metrics: Vec<String>,
    pub query_mode: QueryMode,
    pub query_text: String,
    pub result_count: usize,
}

impl AxisInputs {
    /// Number of configurations [`build`] will produce
    pub fn space_len(&self) -> usize {
        self.instances.len() * self.min_years.len() * self.thresholds.len() * self.metrics.len()
    }
}

/// One concrete combination of axis values
///
/// Identity is the position in the generated space, not the field values:
/// duplicate axis entries yield distinct, equal-looking configurations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Configuration {
    pub instance: String,
    pub min_year: MinYear,
    pub threshold: f64,
    pub metric: String,
    pub display_name: String,
}

impl Configuration {
    pub fn new(instance: &str, min_year: MinYear, threshold: f64, metric: &str) -> Self {
        Self {
            instance: instance.to_string(),
            min_year,
            threshold,
            metric: metric.to_string(),
            display_name: display_name(instance, min_year, threshold, metric),
        }
    }
}

/// Ordered sequence of every configuration; index = table row
pub type ConfigurationSpace = Vec<Configuration>;

/// Expand axes into the configuration space
///
/// Nesting order is instance outermost, then min year, then threshold, then
/// metric innermost. Row indices downstream depend on this order.
pub fn build(axes: &AxisInputs) -> ConfigurationSpace {
    let mut space = Vec::with_capacity(axes.space_len());
    for instance in &axes.instances {
        for &min_year in &axes.min_years {
            for &threshold in &axes.thresholds {
                for metric in &axes.metrics {
                    space.push(Configuration::new(instance, min_year, threshold, metric));
                }
            }
        }
    }
    space
}

/// `"<last path segment> | <year> | <threshold> | <metric>"`
pub fn display_name(instance: &str, min_year: MinYear, threshold: f64, metric: &str) -> String {
    [
        last_path_segment(instance).to_string(),
        min_year.to_string(),
        threshold.to_string(),
        metric.to_string(),
    ]
    .join(DISPLAY_NAME_SEPARATOR)
}

/// Final non-empty path segment of a `/`-terminated URL
///
/// URLs without a trailing slash are returned unchanged.
pub fn last_path_segment(instance: &str) -> &str {
    let Some(trimmed) = instance.strip_suffix('/') else {
        return instance;
    };
    match trimmed.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => instance,
    }
}

// ============================================================================
// Raw text parsing
// ============================================================================

/// Raw axis entries as typed by a user, before parsing
#[derive(Debug, Clone, Default)]
pub struct AxisText {
    pub instances: Vec<String>,
    pub min_years: Vec<String>,
    pub thresholds: Vec<String>,
    pub metrics: Vec<String>,
    pub query_mode: QueryMode,
    pub query_text: String,
    pub result_count: usize,
}

impl AxisText {
    /// Parse every axis
    ///
    /// In permissive mode malformed numbers become `NaN` sentinels. In strict
    /// mode they, and unknown metrics, are rejected with `InvalidInput`.
    pub fn parse(&self, strict: bool) -> Result<AxisInputs> {
        let instances: Vec<String> = clean_entries(&self.instances)
            .map(normalize_instance)
            .collect();

        let min_years = clean_entries(&self.min_years)
            .map(|raw| parse_min_year(raw, strict))
            .collect::<Result<Vec<_>>>()?;

        let thresholds = clean_entries(&self.thresholds)
            .map(|raw| parse_threshold(raw, strict))
            .collect::<Result<Vec<_>>>()?;

        let metrics: Vec<String> = clean_entries(&self.metrics).map(str::to_string).collect();
        if strict {
            if let Some(unknown) = metrics.iter().find(|m| !KNOWN_METRICS.contains(&m.as_str())) {
                return Err(Error::InvalidInput(format!(
                    "Unknown rank metric '{}' (known: {})",
                    unknown,
                    KNOWN_METRICS.join(", ")
                )));
            }
        }

        Ok(AxisInputs {
            instances,
            min_years,
            thresholds,
            metrics,
            query_mode: self.query_mode,
            query_text: self.query_text.clone(),
            result_count: self.result_count,
        })
    }
}

fn clean_entries(entries: &[String]) -> impl Iterator<Item = &str> {
    entries
        .iter()
        .flat_map(|e| e.lines())
        .map(str::trim)
        .filter(|e| !e.is_empty())
}

/// Ensure an instance URL has a scheme and ends with `/`
pub fn normalize_instance(url: &str) -> String {
    let url = url.trim();
    let mut normalized = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if let Some(rest) = url.strip_prefix("//") {
        format!("http://{}", rest)
    } else {
        format!("http://{}", url)
    };
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Parse a year with leading-integer semantics (`"2020abc"` gives 2020)
pub fn parse_min_year(raw: &str, strict: bool) -> Result<MinYear> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Ok(MinYear::Year(year));
    }
    if strict {
        return Err(Error::InvalidInput(format!("Invalid minimum year '{}'", raw)));
    }
    Ok(leading_integer(raw)
        .map(MinYear::Year)
        .unwrap_or(MinYear::NotANumber))
}

/// Parse a threshold with leading-float semantics (`"0.5x"` gives 0.5)
pub fn parse_threshold(raw: &str, strict: bool) -> Result<f64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<f64>() {
        if value.is_finite() {
            return Ok(value);
        }
    }
    if strict {
        return Err(Error::InvalidInput(format!("Invalid score threshold '{}'", raw)));
    }
    Ok(leading_float(raw).unwrap_or(f64::NAN))
}

fn leading_integer(raw: &str) -> Option<i32> {
    let sign_len = usize::from(raw.starts_with(['+', '-']));
    let digits = raw[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    raw[..sign_len + digits].parse().ok()
}

fn leading_float(raw: &str) -> Option<f64> {
    let candidate_len = raw
        .bytes()
        .take_while(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
        .count();
    (1..=candidate_len)
        .rev()
        .find_map(|len| raw[..len].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
