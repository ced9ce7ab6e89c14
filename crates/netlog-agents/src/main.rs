//! CLI for netlog-agents: set up, check, load and question the logs database.
//!
//! Config comes from `.env`, the environment, then the global flags. Commands
//! that call the model need `OPENAI_API_KEY_TEG` (or `OPENAI_API_KEY`).

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use netlog_agents::config::{Overrides, EXAMPLE_QUERIES, PLACEHOLDER_API_KEY};
use netlog_agents::db::DEFAULT_DB_FILE;
use netlog_agents::doctor::{self, DoctorReport};
use netlog_agents::logging::init_logger;
use netlog_agents::parser::{self, ParseOptions};
use netlog_agents::productivity::calculate_loss;
use netlog_agents::visualization;
use netlog_agents::{Config, ConversationHistory, LogDatabase, MultiAgentSystem};

const ENV_FILE: &str = ".env";

#[derive(Parser)]
#[command(name = "netlog")]
#[command(about = "Ask questions about network-traffic logs with a team of LLM agents")]
struct Args {
    /// Logs database path (default: search logs.db, data/logs.db, ...)
    #[arg(long, global = true, env = "NETLOG_DB")]
    db: Option<PathBuf>,

    /// Model name for the OpenAI-compatible API
    #[arg(long, global = true)]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Debug logging (ignored when RUST_LOG is set)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Directory for netlog.log (default: $XDG_DATA_HOME/netlog)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a .env template and report whether a database is found
    Setup,
    /// Check the environment and database; --live also runs the agents once
    Doctor {
        #[arg(long)]
        live: bool,
    },
    /// Import a raw key=value firewall log into the logs table
    ImportLogs {
        file: PathBuf,
        /// Keep every appcat instead of the default categories
        #[arg(long)]
        all_categories: bool,
    },
    /// Import a CSV export (header row of column names) into the logs table
    ImportCsv { file: PathBuf },
    /// Print the logs table as CSV to stdout
    Dump,
    /// Database summary, duration profile, time cost and top applications
    Stats,
    /// Answer one question
    Ask {
        question: String,
        /// Also print the agent conversation
        #[arg(long)]
        history: bool,
    },
    /// Interactive question loop (empty line or `exit` quits)
    Chat,
    /// Print the agent graph as a Mermaid diagram
    Graph,
    /// Show recent answered questions
    History {
        #[arg(long, short, default_value = "10")]
        limit: usize,
    },
    /// Print example questions
    Examples,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _guard = init_logger(args.log_dir.clone(), args.verbose);

    let config = Config::from_env(Overrides {
        db: args.db.clone(),
        model: args.model.clone(),
        api_base: args.api_base.clone(),
    })?;

    match args.command {
        Command::Setup => setup(&config),
        Command::Doctor { live } => run_doctor(config, live).await,
        Command::ImportLogs {
            file,
            all_categories,
        } => {
            let options = if all_categories {
                ParseOptions::all_categories()
            } else {
                ParseOptions::default()
            };
            let db = import_target(&config)?;
            let report = tokio::task::spawn_blocking(move || {
                parser::import_log_file(&file, &db, &options)
            })
            .await??;
            println!(
                "Imported {} of {} lines ({} skipped)",
                report.imported, report.lines_read, report.skipped
            );
            Ok(())
        }
        Command::ImportCsv { file } => {
            let db = import_target(&config)?;
            let report =
                tokio::task::spawn_blocking(move || parser::import_csv(&file, &db)).await??;
            println!("Imported {} of {} rows", report.imported, report.lines_read);
            Ok(())
        }
        Command::Dump => {
            let db = LogDatabase::locate(&config)?;
            let rows = tokio::task::spawn_blocking(move || {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                parser::dump(&db, &mut out)
            })
            .await??;
            info!(rows, "dump finished");
            Ok(())
        }
        Command::Stats => stats(&config).await,
        Command::Ask { question, history } => {
            let system = MultiAgentSystem::new(config).await?;
            ask(&system, &question, history).await
        }
        Command::Chat => chat(config).await,
        Command::Graph => {
            println!("{}", visualization::diagram(&config));
            Ok(())
        }
        Command::History { limit } => history(&config, limit).await,
        Command::Examples => {
            for (i, q) in EXAMPLE_QUERIES.iter().enumerate() {
                println!("{}. {q}", i + 1);
            }
            Ok(())
        }
    }
}

/// The database imports write to: `--db`/`NETLOG_DB`, else `logs.db`.
fn import_target(config: &Config) -> Result<LogDatabase> {
    let path = config
        .db_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE));
    LogDatabase::open(&path).with_context(|| format!("opening {}", path.display()))
}

fn setup(config: &Config) -> Result<()> {
    let env_file = Path::new(ENV_FILE);
    if env_file.exists() {
        println!("✅ {ENV_FILE} already exists");
    } else {
        std::fs::write(
            env_file,
            format!("OPENAI_API_KEY_TEG={PLACEHOLDER_API_KEY}\n# OPENAI_MODEL=gpt-4o-mini\n"),
        )
        .with_context(|| format!("writing {ENV_FILE}"))?;
        println!("✅ created {ENV_FILE}; put your API key in it");
    }
    match LogDatabase::locate(config) {
        Ok(db) => println!("✅ database: {}", db.path().display()),
        Err(e) => println!("⚠️  {e}\n   load data with `netlog import-logs <file>` or `netlog import-csv <file>`"),
    }
    println!("Next: netlog doctor");
    Ok(())
}

async fn run_doctor(config: Config, live: bool) -> Result<()> {
    let mut report = DoctorReport::default();
    report.checks.push(doctor::check_env(Path::new(ENV_FILE), &config));
    report.checks.push(doctor::check_database(&config).await);
    if live && report.passed() {
        let check = match MultiAgentSystem::new(config).await {
            Ok(system) => doctor::check_agents(&system).await,
            Err(e) => {
                println!("❌ could not build the agent system: {e}");
                bail!("agent system unavailable");
            }
        };
        report.checks.push(check);
    }
    print!("{}", report.render());
    if !report.passed() {
        bail!("doctor found problems");
    }
    Ok(())
}

async fn stats(config: &Config) -> Result<()> {
    let db = LogDatabase::locate(config)?;
    let stats = db.stats().await?;
    println!("{}", stats.describe());
    if let Some(profile) = db.duration_profile().await? {
        println!(
            "duration: max {:.0}, avg {:.2}, min {:.0} over {} sessions (unit: {})",
            profile.max,
            profile.avg,
            profile.min,
            profile.count,
            profile.unit.as_str()
        );
        let loss = calculate_loss(profile.total_seconds(), &config.rates);
        println!("time cost: {}", loss.summary());
        println!("           {}", loss.equivalents());
    }
    println!("top applications:");
    for app in db.top_apps(5).await? {
        println!(
            "  {}: {} sessions, total duration {}",
            app.app, app.sessions, app.total_duration
        );
    }
    Ok(())
}

async fn ask(system: &MultiAgentSystem, question: &str, with_history: bool) -> Result<()> {
    let state = system.process(question).await?;
    println!("{}", MultiAgentSystem::final_answer(&state));
    if with_history {
        let history = MultiAgentSystem::conversation_history(&state);
        println!("\n--- conversation ---\n");
        println!("{}", ConversationHistory::format_for_display(&history));
    }
    Ok(())
}

async fn chat(config: Config) -> Result<()> {
    let system = MultiAgentSystem::new(config).await?;
    println!("{}", system.database_stats().await?.describe());
    println!("Ask about the logs (empty line or `exit` to quit). Try: {}", EXAMPLE_QUERIES[0]);
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() || question.eq_ignore_ascii_case("exit") {
            break;
        }
        if let Err(e) = ask(&system, question, false).await {
            eprintln!("error: {e:#}");
        }
    }
    Ok(())
}

async fn history(config: &Config, limit: usize) -> Result<()> {
    let db = LogDatabase::locate(config)?;
    let runs = netlog_agents::history::RunStore::new(db.path())?;
    let records = runs.list(limit).await?;
    if records.is_empty() {
        println!("No questions answered yet.");
    }
    for run in records {
        let preview: String = run.final_answer.chars().take(120).collect();
        println!(
            "{}  {}\n    {}\n",
            run.created_at.format("%Y-%m-%d %H:%M"),
            run.question,
            preview.replace('\n', " ")
        );
    }
    Ok(())
}
