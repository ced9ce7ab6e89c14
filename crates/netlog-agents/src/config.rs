//! Configuration: API key, model, limits, database location, cost rates.
//!
//! **Interaction**: Built by `main` via `Config::from_env` after
//! `dotenv::dotenv()`; CLI flags arrive as `Overrides`. Consumed by
//! `MultiAgentSystem`, `LogDatabase::locate` and the doctor/setup commands.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Value written to a fresh `.env`; treated as "no key configured".
pub const PLACEHOLDER_API_KEY: &str = "sk-your-api-key-here";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
/// SQL generation attempts per question.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub use langgraph::graph::DEFAULT_RECURSION_LIMIT;

/// Where an existing logs database is looked for, in order.
pub const DB_SEARCH_PATHS: [&str; 4] = [
    "./logs.db",
    "./parser/logs.db",
    "../parser/logs.db",
    "./data/logs.db",
];

pub const EXAMPLE_QUERIES: [&str; 6] = [
    "Show an analysis of user activity",
    "Who spent the most time on social media?",
    "Create a report on application usage",
    "Analyze trends in network usage",
    "Which applications use the most data?",
    "Compare user activity this week",
];

/// Prices used to turn time spent into a cost. All amounts in PLN.
#[derive(Clone, Debug, PartialEq)]
pub struct RateTable {
    pub hourly_rate_pln: f64,
    /// PLN per USD.
    pub usd_rate: f64,
    /// PLN per EUR.
    pub eur_rate: f64,
    pub gold_gram_pln: f64,
    pub btc_pln: f64,
    pub coffee_cup_pln: f64,
    pub streaming_month_pln: f64,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            hourly_rate_pln: 150.0,
            usd_rate: 4.05,
            eur_rate: 4.30,
            gold_gram_pln: 280.0,
            btc_pln: 180_000.0,
            coffee_cup_pln: 15.0,
            streaming_month_pln: 60.0,
        }
    }
}

/// State of the configured API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiKeyStatus {
    Missing,
    Placeholder,
    Present,
}

/// Values given on the command line; they win over the environment.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub db: Option<PathBuf>,
    pub model: Option<String>,
    pub api_base: Option<String>,
}

/// Resolved configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_iterations: usize,
    pub recursion_limit: usize,
    /// Explicit database path; when `None` the search paths are tried.
    pub db_path: Option<PathBuf>,
    pub db_search_paths: Vec<PathBuf>,
    pub rates: RateTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            db_path: None,
            db_search_paths: DB_SEARCH_PATHS.iter().map(PathBuf::from).collect(),
            rates: RateTable::default(),
        }
    }
}

impl Config {
    /// Resolves config from the process environment and CLI overrides.
    /// Caller should run `dotenv::dotenv().ok()` before this.
    pub fn from_env(overrides: Overrides) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), overrides)
    }

    /// Resolves config from an arbitrary variable lookup.
    ///
    /// The key comes from `OPENAI_API_KEY_TEG`, then `OPENAI_API_KEY`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: Overrides,
    ) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self::default();

        cfg.api_key = var("OPENAI_API_KEY_TEG").or_else(|| var("OPENAI_API_KEY"));
        if let Some(base) = overrides.api_base.or_else(|| var("OPENAI_API_BASE")) {
            cfg.api_base = base.trim_end_matches('/').to_string();
        }
        if let Some(model) = overrides.model.or_else(|| var("OPENAI_MODEL")) {
            cfg.model = model;
        }
        if let Some(n) = var("NETLOG_MAX_ITERATIONS") {
            cfg.max_iterations = parse_positive("NETLOG_MAX_ITERATIONS", &n)?;
        }
        if let Some(n) = var("NETLOG_RECURSION_LIMIT") {
            cfg.recursion_limit = parse_positive("NETLOG_RECURSION_LIMIT", &n)?;
        }
        if let Some(rate) = var("NETLOG_HOURLY_RATE") {
            cfg.rates.hourly_rate_pln = rate.parse().map_err(|_| {
                Error::Config(format!("NETLOG_HOURLY_RATE is not a number: {rate}"))
            })?;
        }
        cfg.db_path = overrides.db.or_else(|| var("NETLOG_DB").map(PathBuf::from));
        Ok(cfg)
    }

    pub fn api_key_status(&self) -> ApiKeyStatus {
        match self.api_key.as_deref() {
            None => ApiKeyStatus::Missing,
            Some(PLACEHOLDER_API_KEY) => ApiKeyStatus::Placeholder,
            Some(_) => ApiKeyStatus::Present,
        }
    }

    /// The API key, or a configuration error explaining how to set it.
    pub fn require_api_key(&self) -> Result<&str> {
        match (self.api_key_status(), self.api_key.as_deref()) {
            (ApiKeyStatus::Present, Some(key)) => Ok(key),
            (ApiKeyStatus::Placeholder, _) => Err(Error::Config(
                "OPENAI_API_KEY_TEG still holds the placeholder from `netlog setup`; put your key in .env".into(),
            )),
            _ => Err(Error::Config(
                "OPENAI_API_KEY_TEG (or OPENAI_API_KEY) not set (put it in .env or environment)".into(),
            )),
        }
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::Config(format!("{name} must be a positive integer, got {value}"))),
    }
}
