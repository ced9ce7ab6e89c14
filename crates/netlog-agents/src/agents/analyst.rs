//! Data Analyst: local statistics over the SQL data plus a model-written
//! structured analysis.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use langgraph::{AgentError, ChatRequest, LlmClient, Next, Node};
use serde_json::Value;
use tracing::{info, warn};

use super::analysis::{AnalysisResults, DateRange, ModelAnalysis, Statistics};
use super::state::{AgentKind, AgentState, Route, SqlResult};
use crate::config::RateTable;
use crate::productivity::{calculate_loss, DurationUnit};

/// Rows per SQL result included in the prompt.
const PROMPT_ROWS: usize = 50;

const SYSTEM_PROMPT: &str = r#"You are a Data Analyst for network traffic logs. You analyse SQL results and draw conclusions.

Your tasks:
- analyse the SQL data
- find statistics, trends, patterns and anomalies
- formulate conclusions and recommendations

Reply with ONE JSON object and nothing else:
{
  "summary": "2-3 sentence summary",
  "insights": [{"title": "", "description": "", "category": "usage_patterns|performance|security|trends", "confidence": "high|medium|low", "impact": "high|medium|low"}],
  "trends": [{"metric": "", "direction": "increasing|decreasing|stable|volatile", "magnitude": 0.0, "time_period": "", "significance": "high|medium|low"}],
  "recommendations": [{"title": "", "description": "", "priority": "critical|high|medium|low", "estimated_impact": "", "implementation_effort": "", "success_metrics": [""]}],
  "confidence_overall": "high|medium|low"
}"#;

/// Figures computed without the model.
pub fn compute_statistics(
    results: &[&SqlResult],
    unit: DurationUnit,
    rates: &RateTable,
) -> Statistics {
    let mut stats = Statistics {
        total_records: results.iter().map(|r| r.row_count).sum(),
        ..Default::default()
    };

    let (mut cells, mut filled) = (0usize, 0usize);
    let mut dates: Vec<String> = Vec::new();
    for r in results {
        for row in &r.data.rows {
            cells += row.len();
            filled += row.iter().filter(|v| !v.is_null()).count();
        }
        for name in ["date", "timestamp", "day"] {
            if let Some(idx) = r.data.column_index(name) {
                dates.extend(
                    r.data
                        .rows
                        .iter()
                        .filter_map(|row| row.get(idx).and_then(Value::as_str).map(str::to_string)),
                );
                break;
            }
        }
    }
    stats.data_quality_score = if cells == 0 { 0.0 } else { filled as f64 / cells as f64 };
    dates.sort();
    if let (Some(start), Some(end)) = (dates.first(), dates.last()) {
        stats.date_range = Some(DateRange {
            start: start.clone(),
            end: end.clone(),
        });
    }

    // Totals of the most recent result's numeric columns.
    let Some(latest) = results.last() else {
        return stats;
    };
    let mut priced = false;
    for (idx, column) in latest.data.columns.iter().enumerate() {
        let values = latest.data.numeric_column(idx);
        if values.is_empty() {
            continue;
        }
        let total: f64 = values.iter().sum();
        stats
            .key_metrics
            .insert(total_metric_name(column), format_number(total));
        if !priced {
            if let Some(seconds) = seconds_for_column(column, total, unit) {
                let loss = calculate_loss(seconds, rates);
                stats
                    .key_metrics
                    .insert("time cost".to_string(), loss.summary());
                stats
                    .key_metrics
                    .insert("time cost equivalents".to_string(), loss.equivalents());
                priced = true;
            }
        }
    }
    stats
}

/// `hours` → `total hours`; aliases such as `total_seconds` are kept as is.
fn total_metric_name(column: &str) -> String {
    if column.to_lowercase().starts_with("total") {
        column.to_string()
    } else {
        format!("total {column}")
    }
}

/// Seconds represented by `total` when `column` looks like a time column.
fn seconds_for_column(column: &str, total: f64, unit: DurationUnit) -> Option<f64> {
    let c = column.to_lowercase();
    if c.contains("hour") {
        Some(total * 3600.0)
    } else if c.contains("minute") {
        Some(total * 60.0)
    } else if c.contains("second") {
        Some(total)
    } else if c.contains("duration") {
        Some(unit.to_seconds(total))
    } else {
        None
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v:.2}")
    }
}

/// The JSON object inside a model reply, if any.
fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Parses a model reply into a structured analysis; `None` when it is not one.
pub fn parse_model_analysis(reply: &str) -> Option<ModelAnalysis> {
    let parsed: ModelAnalysis = serde_json::from_str(extract_json(reply)?).ok()?;
    (!parsed.is_empty()).then_some(parsed)
}

/// Data Analyst node.
pub struct AnalystAgent {
    llm: Arc<dyn LlmClient>,
    temperature: f32,
    rates: RateTable,
    duration_unit: DurationUnit,
}

impl AnalystAgent {
    pub fn new(llm: Arc<dyn LlmClient>, temperature: f32, rates: RateTable) -> Self {
        Self {
            llm,
            temperature,
            rates,
            duration_unit: DurationUnit::Milliseconds,
        }
    }

    pub fn with_duration_unit(mut self, unit: DurationUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    fn request(&self, state: &AgentState, results: &[&SqlResult], stats: &Statistics) -> ChatRequest {
        let data: Vec<Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "question": r.question,
                    "sql": r.sql,
                    "columns": r.data.columns,
                    "rows": r.data.rows.iter().take(PROMPT_ROWS).collect::<Vec<_>>(),
                    "row_count": r.row_count,
                })
            })
            .collect();
        let user = format!(
            "Question: {}\n\nSQL data:\n{}\n\nComputed statistics:\n{}",
            state.latest_question().unwrap_or_default(),
            serde_json::to_string_pretty(&data).unwrap_or_default(),
            serde_json::to_string_pretty(stats).unwrap_or_default()
        );
        ChatRequest::with_system(SYSTEM_PROMPT, user).temperature(self.temperature)
    }

    /// Builds the analysis for the successful SQL results in `state`.
    pub async fn analyse(&self, state: &AgentState) -> AnalysisResults {
        let started = Instant::now();
        let results: Vec<&SqlResult> = state.successful_sql_results().collect();
        let statistics = compute_statistics(&results, self.duration_unit, &self.rates);

        let (model, analysis) = match self.llm.chat(self.request(state, &results, &statistics)).await {
            Ok(reply) => match parse_model_analysis(&reply.content) {
                Some(model) => (model, None),
                None => (ModelAnalysis::default(), Some(reply.content)),
            },
            Err(e) => {
                warn!(error = %e, "analysis request failed, keeping local statistics only");
                (ModelAnalysis::default(), None)
            }
        };

        AnalysisResults {
            model,
            statistics,
            analysis,
            data_points: results.len(),
            data_completeness: results.len() as f64 / state.sql_results.len().max(1) as f64,
            processing_time_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        }
    }
}

fn summary_message(analysis: &AnalysisResults) -> String {
    let mut msg = String::from("Analysis finished.");
    if let Some(summary) = &analysis.model.summary {
        msg.push_str(&format!("\n{summary}"));
    } else if let Some(text) = &analysis.analysis {
        msg.push_str(&format!("\n{text}"));
    }
    for (k, v) in &analysis.statistics.key_metrics {
        msg.push_str(&format!("\n- {k}: {v}"));
    }
    msg
}

#[async_trait]
impl Node<AgentState> for AnalystAgent {
    fn id(&self) -> &str {
        AgentKind::Analyst.id()
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        if !state.has_sql_results() {
            return Ok(state.finish(
                AgentKind::Analyst,
                "No data to analyse. Handing over to the SQL Agent.",
                AgentKind::SqlAgent.into(),
            ));
        }
        let analysis = self.analyse(&state).await;
        info!(
            structured = analysis.is_structured(),
            insights = analysis.model.insights.len(),
            "analysis finished"
        );
        let message = summary_message(&analysis);
        let mut state = state;
        state.analysis_results = Some(analysis);
        Ok(state.finish(
            AgentKind::Analyst,
            message,
            Route::Agent(AgentKind::ReportWriter),
        ))
    }
}
