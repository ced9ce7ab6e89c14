//! Locating, loading and checking the logs database.

use netlog_agents::config::Config;
use netlog_agents::doctor::{check_database, DoctorReport};
use netlog_agents::parser::{dump, import_csv};
use netlog_agents::{Error, LogDatabase};

const CSV: &str = "date,time,srcname,app,appcat,duration,extra\n\
2024-05-01,08:00:00,anna-pc,YouTube,Video.Audio,360,x\n\
2024-05-01,09:00:00,anna-pc,Facebook,Social.Media,,y\n\
2024-05-02,10:00:00,jan-laptop,YouTube,Video.Audio,120,z\n";

fn searching_only(dir: &std::path::Path) -> Config {
    Config {
        db_search_paths: vec![dir.join("missing.db"), dir.join("data").join("missing.db")],
        ..Default::default()
    }
}

#[tokio::test]
async fn builds_database_from_logs_csv_when_none_found() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logi_export.csv"), CSV).unwrap();

    let db = LogDatabase::locate_in(&searching_only(dir.path()), dir.path()).unwrap();
    assert_eq!(db.path(), dir.path().join("logs.db"));

    let stats = db.stats().await.unwrap();
    assert_eq!(stats.total_rows, 3);
    assert_eq!(stats.unique_users, 2);
    assert_eq!(stats.unique_apps, 2);

    let top = db.top_apps(5).await.unwrap();
    assert_eq!(top[0].app, "YouTube");
    assert_eq!(top[0].sessions, 2);
    assert_eq!(top[0].total_duration, 480);

    let nulls = db
        .query("SELECT COUNT(*) AS n FROM logs WHERE duration IS NULL")
        .await
        .unwrap();
    assert_eq!(nulls.rows[0][0], serde_json::json!(1));
}

#[test]
fn unrelated_csv_is_not_used() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("sales.csv"), CSV).unwrap();

    let err = LogDatabase::locate_in(&searching_only(dir.path()), dir.path()).unwrap_err();
    assert!(matches!(err, Error::DatabaseNotFound { .. }));
    assert!(err.to_string().contains("missing.db"));
}

#[test]
fn explicit_path_wins_and_dump_lists_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("export.csv");
    std::fs::write(&csv_path, CSV).unwrap();
    let config = Config {
        db_path: Some(dir.path().join("nested").join("mine.db")),
        ..Default::default()
    };

    let db = LogDatabase::locate_in(&config, dir.path()).unwrap();
    assert!(db.path().ends_with("nested/mine.db"));
    let report = import_csv(&csv_path, &db).unwrap();
    assert_eq!(report.imported, 3);

    let mut out = Vec::new();
    assert_eq!(dump(&db, &mut out).unwrap(), 3);
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("date, time, eventtime"));
    assert!(text.contains("Facebook"));
    assert!(text.contains("None"));
}

#[tokio::test]
async fn doctor_reports_a_loaded_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        db_path: Some(dir.path().join("logs.db")),
        ..Default::default()
    };
    let db = LogDatabase::locate(&config).unwrap();
    let csv_path = dir.path().join("logi.csv");
    std::fs::write(&csv_path, CSV).unwrap();
    import_csv(&csv_path, &db).unwrap();

    let check = check_database(&config).await;
    assert!(check.passed, "{:?}", check.lines);
    assert!(check.lines.iter().any(|l| l.contains("records: 3")));
    assert!(check.lines.iter().any(|l| l.contains("YouTube: 2 sessions")));

    let report = DoctorReport {
        checks: vec![check],
    };
    assert!(report.passed());
    assert!(report.render().contains("Database: ✅ OK"));
}
