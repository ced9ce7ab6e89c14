//! End-to-end runs of the agent graph over a temporary logs database, with a
//! scripted model in place of the hosted API.

use std::path::Path;
use std::sync::Arc;

use langgraph::{LlmClient, LlmError, MockLlmClient};
use netlog_agents::config::Config;
use netlog_agents::parser::{import_log_file, ParseOptions};
use netlog_agents::{AgentKind, ConversationHistory, LogDatabase, MultiAgentSystem};

const LOGS: &str = r#"date=2024-05-01 time=08:00:00 srcname="anna-pc" app="YouTube" appcat="Video.Audio" duration=360 sentbyte=1000 rcvdbyte=900000
date=2024-05-01 time=09:30:00 srcname="anna-pc" app="Facebook" appcat="Social.Media" duration=180 sentbyte=2000 rcvdbyte=50000
date=2024-05-02 time=10:00:00 srcname="jan-laptop" app="YouTube" appcat="Video.Audio" duration=120 sentbyte=500 rcvdbyte=300000
date=2024-05-02 time=11:15:00 srcname="jan-laptop" app="Steam" appcat="Game" duration=60 sentbyte=100 rcvdbyte=80000
date=2024-05-03 time=12:00:00 srcname="ola-mac" app="Office365" appcat="Collaboration" duration=7200 sentbyte=100 rcvdbyte=100
"#;

const TOP_APPS_SQL: &str =
    "```sql\nSELECT app, SUM(duration) AS total_seconds FROM logs GROUP BY app ORDER BY total_seconds DESC LIMIT 5;\n```";

const ANALYSIS_JSON: &str = r#"Here is the analysis:
{
  "summary": "Video streaming takes most of the logged time.",
  "insights": [
    {"title": "YouTube leads", "description": "YouTube has the longest sessions", "category": "usage_patterns", "confidence": "high", "impact": "high"}
  ],
  "trends": [],
  "recommendations": [
    {"title": "Limit streaming", "description": "Shape video traffic during work hours", "priority": "high"}
  ],
  "confidence_overall": "high"
}"#;

fn seeded_db(dir: &Path) -> LogDatabase {
    let log_path = dir.join("fw.log");
    std::fs::write(&log_path, LOGS).unwrap();
    let db = LogDatabase::open(dir.join("logs.db")).unwrap();
    let report = import_log_file(&log_path, &db, &ParseOptions::default()).unwrap();
    assert_eq!(report.imported, 4);
    assert_eq!(report.skipped, 1);
    db
}

fn config_for(db: &LogDatabase) -> Config {
    Config {
        api_key: Some("sk-test".into()),
        db_path: Some(db.path().to_path_buf()),
        ..Default::default()
    }
}

async fn system_with(llm: Arc<MockLlmClient>, db: LogDatabase) -> MultiAgentSystem {
    let config = config_for(&db);
    let llm: Arc<dyn LlmClient> = llm;
    MultiAgentSystem::with_llm(config, llm, db).await.unwrap()
}

#[tokio::test]
async fn analysis_question_runs_every_agent() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::with_replies([TOP_APPS_SQL, ANALYSIS_JSON]));
    let system = system_with(llm.clone(), db).await;

    let state = system
        .process("Analyze which applications use the most time")
        .await
        .unwrap();

    let roles: Vec<String> = ConversationHistory::from_state(&state)
        .into_iter()
        .map(|e| e.role)
        .collect();
    assert_eq!(
        roles,
        ["user", "supervisor", "sql_agent", "analyst", "report_writer"]
    );
    // The supervisor routed by rule; only SQL generation and analysis hit the model.
    assert_eq!(llm.call_count(), 2);

    assert!(state.has_sql_results());
    let sql = &state.sql_results[0];
    assert_eq!(sql.attempts, 1);
    assert_eq!(sql.row_count, 3);
    assert_eq!(sql.data.rows[0][0], serde_json::json!("YouTube"));

    let analysis = state.analysis_results.as_ref().unwrap();
    assert!(analysis.is_structured());
    assert_eq!(analysis.statistics.total_records, 3);

    let answer = MultiAgentSystem::final_answer(&state);
    assert!(answer.starts_with("# 📊 Data Analysis Report"));
    assert!(answer.contains("Video streaming takes most of the logged time."));
    assert!(answer.contains("Key finding: YouTube leads."));
    assert!(answer.contains("Limit streaming"));
    assert_eq!(state.last_message_from(AgentKind::ReportWriter), Some(answer.as_str()));
}

#[tokio::test]
async fn listing_question_skips_the_analyst() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::with_replies([TOP_APPS_SQL]));
    let system = system_with(llm.clone(), db).await;

    let state = system
        .process("Show me the 5 most used applications")
        .await
        .unwrap();

    assert!(state.analysis_results.is_none());
    assert_eq!(llm.call_count(), 1);
    let answer = MultiAgentSystem::final_answer(&state);
    assert!(answer.contains("Fallback Mode"));
    assert!(answer.contains("YouTube"));
}

#[tokio::test]
async fn analysis_outage_still_reports_local_statistics() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::with_replies([TOP_APPS_SQL]));
    llm.push_error(LlmError::Network("connection reset".into()));
    let system = system_with(llm.clone(), db).await;

    let state = system
        .process("Analyze application usage")
        .await
        .unwrap();

    assert_eq!(llm.call_count(), 2);
    let analysis = state.analysis_results.as_ref().unwrap();
    assert!(!analysis.is_structured());
    assert!(analysis.analysis.is_none());
    assert_eq!(analysis.statistics.total_records, 3);

    let answer = MultiAgentSystem::final_answer(&state);
    assert!(answer.contains("Fallback Mode"));
    assert!(answer.contains("YouTube"));
    assert!(answer.contains("- **Total Records**: 3"));
    assert!(answer.contains("- **total_seconds**: 720"));
    assert!(answer.contains("- **time cost**: 0h 12m"));
}

#[tokio::test]
async fn failed_query_is_retried_with_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::with_replies([
        "SELECT application FROM logs",
        "SELECT app, COUNT(*) AS sessions FROM logs GROUP BY app",
    ]));
    let system = system_with(llm.clone(), db).await;

    let state = system.process("Show application usage").await.unwrap();

    let sql = &state.sql_results[0];
    assert!(sql.is_success());
    assert_eq!(sql.attempts, 2);
    assert_eq!(sql.row_count, 3);

    let retry = &llm.requests()[1];
    let last = retry.messages.last().unwrap();
    assert!(format!("{last:?}").contains("no such column: application"));
}

#[tokio::test]
async fn writes_are_rejected_and_the_run_ends_with_the_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::new("DELETE FROM logs"));
    let mut config = config_for(&db);
    config.max_iterations = 3;
    let system = MultiAgentSystem::with_llm(config, llm.clone(), db.clone())
        .await
        .unwrap();

    let state = system.process("Show user activity").await.unwrap();

    assert!(state.sql_failed());
    assert_eq!(state.sql_results[0].attempts, 3);
    assert_eq!(llm.call_count(), 3);
    let answer = MultiAgentSystem::final_answer(&state);
    assert!(answer.starts_with("Could not fetch data from the logs database"));
    assert_eq!(state.last_agent_message().unwrap().speaker.role(), "supervisor");

    // Nothing was deleted.
    assert_eq!(db.stats().await.unwrap().total_rows, 4);
}

#[tokio::test]
async fn model_outage_ends_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::new("SELECT 1"));
    llm.push_error(LlmError::RateLimit("slow down".into()));
    let system = system_with(llm.clone(), db).await;

    let state = system.process("Show me the top users").await.unwrap();

    assert!(state.sql_failed());
    assert_eq!(llm.call_count(), 1);
    assert!(state.last_sql_error().unwrap().starts_with("LLM error:"));
}

#[tokio::test]
async fn runs_are_saved_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::new(
        "SELECT srcname, COUNT(*) AS n FROM logs GROUP BY srcname",
    ));
    let system = system_with(llm, db).await;

    system.process("Show user activity").await.unwrap();
    system.process("Show application usage").await.unwrap();

    let runs = system.runs().list(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].question, "Show application usage");
    assert_eq!(runs[1].question, "Show user activity");
    assert_eq!(runs[0].transcript.first().unwrap().role, "user");
    assert!(runs[0].final_answer.contains("# 📊 Data Analysis Report"));
}

#[tokio::test]
async fn context_carries_database_summary() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path());
    let llm = Arc::new(MockLlmClient::new(TOP_APPS_SQL));
    let system = system_with(llm, db).await;

    let state = system.process("Show application usage").await.unwrap();

    let summary = state.context["database"].as_str().unwrap();
    assert!(summary.starts_with("4 records"));
    assert_eq!(state.context["duration_unit"], "seconds");
}
