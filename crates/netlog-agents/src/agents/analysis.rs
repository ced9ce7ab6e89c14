//! Structured analysis produced by the Data Analyst.
//!
//! The model is asked for JSON; every field is lenient (unknown enum strings
//! fall back to the default, missing fields default) so a partially valid
//! reply still yields a usable analysis.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Confidence / impact / significance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    #[default]
    Medium,
    Low,
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    #[default]
    UsagePatterns,
    Performance,
    Security,
    Trends,
}

impl InsightCategory {
    pub const ALL: [InsightCategory; 4] = [
        Self::UsagePatterns,
        Self::Performance,
        Self::Security,
        Self::Trends,
    ];
}

impl FromStr for InsightCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "usage_patterns" | "usage" => Ok(Self::UsagePatterns),
            "performance" => Ok(Self::Performance),
            "security" => Ok(Self::Security),
            "trends" | "trend" => Ok(Self::Trends),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increasing,
    Decreasing,
    #[default]
    Stable,
    Volatile,
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "increasing" | "up" => Ok(Self::Increasing),
            "decreasing" | "down" => Ok(Self::Decreasing),
            "stable" => Ok(Self::Stable),
            "volatile" => Ok(Self::Volatile),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(()),
        }
    }
}

/// Deserializes any string with `FromStr`, falling back to the default.
fn lenient<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    let raw: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default())
}

/// Accepts a number or a numeric string such as `"+12.5%"`.
fn lenient_number<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .trim_start_matches('+')
            .parse()
            .unwrap_or(0.0),
        _ => 0.0,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insight {
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "lenient")]
    pub category: InsightCategory,
    #[serde(deserialize_with = "lenient")]
    pub confidence: Level,
    #[serde(deserialize_with = "lenient")]
    pub impact: Level,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trend {
    pub metric: String,
    #[serde(deserialize_with = "lenient")]
    pub direction: Direction,
    /// Percent change; 0 means stable.
    #[serde(deserialize_with = "lenient_number")]
    pub magnitude: f64,
    pub time_period: String,
    #[serde(deserialize_with = "lenient")]
    pub significance: Level,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    #[serde(deserialize_with = "lenient")]
    pub priority: Priority,
    pub estimated_impact: String,
    pub implementation_effort: String,
    pub success_metrics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Locally computed figures about the SQL data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub total_records: usize,
    pub date_range: Option<DateRange>,
    /// Share of non-null cells, 0..=1.
    pub data_quality_score: f64,
    pub key_metrics: BTreeMap<String, String>,
}

/// The part of the analysis that comes from the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelAnalysis {
    pub summary: Option<String>,
    pub insights: Vec<Insight>,
    pub trends: Vec<Trend>,
    pub recommendations: Vec<Recommendation>,
    #[serde(deserialize_with = "lenient")]
    pub confidence_overall: Level,
}

impl ModelAnalysis {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.insights.is_empty()
            && self.trends.is_empty()
            && self.recommendations.is_empty()
    }
}

/// Everything the Data Analyst hands to the Report Writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    #[serde(flatten)]
    pub model: ModelAnalysis,
    pub statistics: Statistics,
    /// Raw model reply when it was not valid analysis JSON.
    pub analysis: Option<String>,
    /// Number of successful SQL results analysed.
    pub data_points: usize,
    /// Share of SQL runs that succeeded, 0..=1.
    pub data_completeness: f64,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl AnalysisResults {
    /// Has insights, trends, recommendations or a summary.
    pub fn is_structured(&self) -> bool {
        !self.model.is_empty()
    }

    /// Has anything a report can be written from.
    pub fn has_content(&self) -> bool {
        self.is_structured() || self.analysis.as_deref().is_some_and(|a| !a.trim().is_empty())
    }
}
