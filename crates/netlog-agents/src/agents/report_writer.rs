//! Report Writer: renders the final markdown report.
//!
//! Deterministic; the report is assembled from the analysis and SQL data
//! without another model call.

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use langgraph::{AgentError, Next, Node};
use tracing::info;

use super::analysis::{
    AnalysisResults, Direction, Insight, InsightCategory, Level, Priority, Recommendation, Trend,
};
use super::state::{AgentKind, AgentState, Route, SqlResult};

pub const AGENT_VERSION: &str = "v2.0";

/// Rows of each SQL result shown in the fallback report.
const FALLBACK_ROWS: usize = 20;

/// Renders the report for `state`, stamped with `now`.
pub fn render(state: &AgentState, now: DateTime<Local>) -> String {
    let stamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let sql: Vec<&SqlResult> = state.successful_sql_results().collect();
    match &state.analysis_results {
        Some(a) if a.is_structured() => structured_report(a, &stamp),
        Some(a) if a.has_content() => available_analysis_report(a, &sql, &stamp),
        analysis if !sql.is_empty() => fallback_report(&sql, analysis.as_ref(), &stamp),
        _ => limited_report(),
    }
}

fn structured_report(a: &AnalysisResults, stamp: &str) -> String {
    let sections = [
        executive_summary(a),
        insights_section(&a.model.insights),
        trends_section(&a.model.trends),
        recommendations_section(&a.model.recommendations),
        supporting_data(a),
    ];
    format!(
        "# 📊 Data Analysis Report\n\n{}\n---\n**Report Generated**: {} | **Agent Version**: {}  \n**Analysis Confidence**: {}\n",
        sections.join("\n"),
        stamp,
        AGENT_VERSION,
        a.model.confidence_overall
    )
}

fn executive_summary(a: &AnalysisResults) -> String {
    let high_impact: Vec<&Insight> = a
        .model
        .insights
        .iter()
        .filter(|i| i.impact == Level::High)
        .collect();
    let top = match high_impact.first() {
        Some(i) => format!("Key finding: {}.", non_empty(&i.title, "Critical insight identified")),
        None => "Detailed patterns and trends identified in the data require further investigation."
            .to_string(),
    };
    let mut out = String::from("## 🎯 Executive Summary\n\n");
    let _ = writeln!(
        out,
        "Analysis of {} data records reveals {} high-impact insights with {} confidence level.",
        group_thousands(a.statistics.total_records),
        high_impact.len(),
        a.model.confidence_overall.to_string().to_lowercase()
    );
    if let Some(summary) = &a.model.summary {
        let _ = writeln!(out, "{summary}");
    }
    let _ = writeln!(out, "{top}");
    out
}

fn category_title(c: InsightCategory) -> &'static str {
    match c {
        InsightCategory::UsagePatterns => "### 📈 Usage Patterns",
        InsightCategory::Performance => "### ⚡ Performance Analysis",
        InsightCategory::Security => "### 🔒 Security Insights",
        InsightCategory::Trends => "### 📊 Trend Analysis",
    }
}

fn insights_section(insights: &[Insight]) -> String {
    if insights.is_empty() {
        return "## 📊 Key Findings\n\nNo significant insights identified.\n".to_string();
    }
    let mut out = String::from("## 📊 Key Findings\n\n");
    for category in InsightCategory::ALL {
        let group: Vec<&Insight> = insights.iter().filter(|i| i.category == category).collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}\n", category_title(category));
        for i in group {
            let confidence = match i.confidence {
                Level::High => "🟢",
                Level::Medium => "🟡",
                Level::Low => "🔴",
            };
            let impact = match i.impact {
                Level::High => "🚨",
                Level::Medium => "⚠️",
                Level::Low => "ℹ️",
            };
            let _ = writeln!(
                out,
                "- **{}** {} {}\n  {}\n",
                non_empty(&i.title, "Insight"),
                confidence,
                impact,
                non_empty(&i.description, "No description available")
            );
        }
    }
    out
}

fn trends_section(trends: &[Trend]) -> String {
    if trends.is_empty() {
        return "## 📈 Trends & Patterns\n\nNo clear trends identified in the analyzed period.\n"
            .to_string();
    }
    let mut out = String::from("## 📈 Trends & Patterns\n\n");
    for t in trends {
        let marker = match t.direction {
            Direction::Increasing => "📈",
            Direction::Decreasing => "📉",
            Direction::Stable => "➡️",
            Direction::Volatile => "📊",
        };
        let change = if t.magnitude == 0.0 {
            "stable".to_string()
        } else {
            format!("{:+.1}%", t.magnitude)
        };
        let _ = writeln!(
            out,
            "- **{}** {}\n  Change: {} over {}\n  Significance: {}\n",
            non_empty(&t.metric, "Unknown metric"),
            marker,
            change,
            non_empty(&t.time_period, "analyzed period"),
            t.significance.to_string().to_lowercase()
        );
    }
    out
}

fn recommendations_section(recs: &[Recommendation]) -> String {
    if recs.is_empty() {
        return "## 🎯 Recommendations\n\nNo specific recommendations at this time.\n".to_string();
    }
    let mut out = String::from("## 🎯 Actionable Recommendations\n\n");
    for priority in Priority::ALL {
        let group: Vec<&Recommendation> = recs.iter().filter(|r| r.priority == priority).collect();
        if group.is_empty() {
            continue;
        }
        let (marker, name) = match priority {
            Priority::Critical => ("🚨", "Critical"),
            Priority::High => ("🔥", "High"),
            Priority::Medium => ("⚠️", "Medium"),
            Priority::Low => ("💡", "Low"),
        };
        let _ = writeln!(out, "### {marker} {name} Priority\n");
        for (n, r) in group.iter().enumerate() {
            let _ = writeln!(
                out,
                "**{}. {}**\n\n{}\n",
                n + 1,
                non_empty(&r.title, "Recommendation"),
                non_empty(&r.description, "No description available")
            );
            let _ = writeln!(out, "- **Impact**: {}", non_empty(&r.estimated_impact, "Unknown"));
            let _ = writeln!(
                out,
                "- **Effort**: {}",
                non_empty(&r.implementation_effort, "Unknown")
            );
            if !r.success_metrics.is_empty() {
                let _ = writeln!(out, "- **Success Metrics**: {}", r.success_metrics.join(", "));
            }
            out.push('\n');
        }
    }
    out
}

fn supporting_data(a: &AnalysisResults) -> String {
    let stats = &a.statistics;
    let mut out = String::from("## 📋 Supporting Data\n\n### Dataset Overview\n\n");
    let _ = writeln!(out, "- **Total Records**: {}", group_thousands(stats.total_records));
    if let Some(range) = &stats.date_range {
        let _ = writeln!(out, "- **Date Range**: {} to {}", range.start, range.end);
    }
    let _ = writeln!(out, "- **Data Quality Score**: {:.1}%", stats.data_quality_score * 100.0);
    let _ = writeln!(out, "- **Analysis Completeness**: {:.1}%", a.data_completeness * 100.0);
    let _ = writeln!(out, "- **Processing Time**: {}ms\n", a.processing_time_ms);
    if !stats.key_metrics.is_empty() {
        out.push_str("### Key Metrics\n\n");
        for (k, v) in &stats.key_metrics {
            let _ = writeln!(out, "- **{k}**: {v}");
        }
        out.push('\n');
    }
    out
}

fn available_analysis_report(a: &AnalysisResults, sql: &[&SqlResult], stamp: &str) -> String {
    let mut out = String::from(
        "# 📊 Data Analysis Report\n\n## 🎯 Executive Summary\n\nAnalysis completed with available data. Key findings are presented below based on the current dataset.\n\n## 📊 Available Analysis\n\n",
    );
    if let Some(text) = &a.analysis {
        let _ = writeln!(out, "{}\n", text.trim());
    }
    out.push_str(&data_summary(sql));
    out.push_str(&supporting_data(a));
    let _ = write!(
        out,
        "---\n**Report Generated**: {stamp} | **Agent Version**: {AGENT_VERSION}\n"
    );
    out
}

fn data_summary(sql: &[&SqlResult]) -> String {
    if sql.is_empty() {
        return String::new();
    }
    let mut out = String::from("## 📋 Data Summary\n\n");
    for r in sql {
        let _ = writeln!(
            out,
            "**{}** ({} rows)\n\n```\n{}```\n",
            r.question,
            r.row_count,
            r.data.render_table(FALLBACK_ROWS)
        );
    }
    out
}

/// SQL data only. Local statistics from a failed analysis are kept.
fn fallback_report(sql: &[&SqlResult], analysis: Option<&AnalysisResults>, stamp: &str) -> String {
    format!(
        "# 📊 Data Analysis Report\n\n## 🎯 Executive Summary\n\nBasic data extraction completed. The analysis step produced no results, but the raw data is available for review.\n\n{}{}## 🔧 Recommendations\n\n1. **Review Analysis Pipeline**: Check the data analyst configuration and model access\n2. **Validate Data Quality**: Ensure data formats are consistent\n3. **Monitor System Health**: Check the logs for errors\n\n---\n**Report Generated**: {} | **Agent Version**: {}  \n**Status**: Fallback Mode - Limited Analysis Available\n",
        data_summary(sql),
        analysis.map(supporting_data).unwrap_or_default(),
        stamp,
        AGENT_VERSION
    )
}

fn limited_report() -> String {
    "# 📊 Data Analysis Report\n\n## ⚠️ Limited Analysis Available\n\nThe analysis data was not available in the expected structured format.\nThis may indicate an issue with the data analysis pipeline.\n\n**Recommendation**: Review the data analysis process and ensure proper data validation.\n"
        .to_string()
}

fn non_empty<'a>(s: &'a str, default: &'a str) -> &'a str {
    if s.trim().is_empty() {
        default
    } else {
        s
    }
}

/// `12345` → `12,345`.
fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Report Writer node. Always ends the run.
pub struct ReportWriterAgent;

#[async_trait]
impl Node<AgentState> for ReportWriterAgent {
    fn id(&self) -> &str {
        AgentKind::ReportWriter.id()
    }

    async fn run(&self, state: AgentState) -> Result<(AgentState, Next), AgentError> {
        let report = render(&state, Local::now());
        info!(chars = report.len(), "report written");
        Ok(state.finish(AgentKind::ReportWriter, report, Route::End))
    }
}
