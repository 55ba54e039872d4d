//! Skillpath CLI - curriculum progress with offline-first sync.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skillpath_core::{Curriculum, Score, SyncConfig, TopicId};
use skillpath_progress::{HttpProgressClient, ProgressStore, SyncOutcome};
use skillpath_storage::JsonStorage;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skillpath")]
#[command(about = "Track lecture and practice progress through a curriculum", long_about = None)]
struct Cli {
    /// Directory holding the local mirror and config.json
    #[arg(long, default_value = ".skillpath")]
    data_dir: PathBuf,

    /// Skip reconciling with the remote authority before the command
    #[arg(long)]
    local: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the curriculum (entries are "Name" or "Name: description")
    Roadmap {
        /// Entries in prerequisite order
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// Show progress through the curriculum
    Status,
    /// Show whether a topic's lecture and practice are unlocked
    Check {
        /// Topic name
        topic: String,
    },
    /// Record that a lecture was viewed
    View {
        /// Topic name
        topic: String,
    },
    /// Record that a practice session was finished
    Complete {
        /// Topic name
        topic: String,
        /// Quiz score (0-100)
        #[arg(long)]
        quiz: Option<i64>,
        /// Code score (0-100)
        #[arg(long)]
        code: Option<i64>,
    },
    /// Reconcile with the remote authority and retry queued updates
    Sync,
    /// Forget the cached curriculum, progress and queued updates
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli.data_dir).await?;
    let local = JsonStorage::new(&cli.data_dir).await?;
    let remote = HttpProgressClient::new(&config);
    let mut store = ProgressStore::open(local, remote, &config).await?;

    let refresh_first = !cli.local
        && !matches!(
            cli.command,
            Commands::Roadmap { .. } | Commands::Sync | Commands::Logout
        );
    if refresh_first {
        let outcome = store.refresh().await?;
        debug!("Startup refresh: {:?}", outcome);
    }

    match cli.command {
        Commands::Roadmap { entries } => {
            let curriculum = Curriculum::parse(entries);
            let count = curriculum.len();
            store.set_curriculum(curriculum).await?;
            println!("Curriculum set ({} topics)", count);
        }
        Commands::Status => {
            let overview = store.overview();
            if overview.total_topics == 0 {
                println!("No curriculum. Set one with `skillpath roadmap`.");
                return Ok(());
            }

            println!("Progress: {}% ({}/{} completed)", overview.percentage, overview.completed, overview.total_topics);
            println!("  In progress: {}", overview.in_progress);
            println!("  Not started: {}", overview.not_started);
            if let Some(avg) = overview.average_quiz_score {
                println!("  Avg quiz score: {:.1}", avg);
            }
            if let Some(avg) = overview.average_code_score {
                println!("  Avg code score: {:.1}", avg);
            }
            if let Some(next) = &overview.next_topic {
                println!("  Next: {}", next);
            }
            println!();
            for (topic, state) in &overview.topics {
                println!("  {:<12} {}", format_state(*state), topic);
            }
            if !store.outbox().is_empty() {
                println!();
                println!("{} update(s) waiting to sync", store.outbox().len());
            }
        }
        Commands::Check { topic } => {
            let topic = TopicId::new(&topic);
            println!("Topic: {}", topic);
            println!("  State: {}", store.topic_state(topic.as_str()));
            println!("  Lecture: {}", format_access(store.is_lecture_accessible(topic.as_str())));
            println!("  Practice: {}", format_access(store.is_practice_accessible(topic.as_str())));
            if !store.curriculum().contains(topic.as_str()) {
                println!("  (not in the curriculum)");
            }
        }
        Commands::View { topic } => {
            let topic = TopicId::new(&topic);
            if !store.is_lecture_accessible(topic.as_str()) {
                print_locked(&store, &topic);
                return Ok(());
            }
            let outcome = store.record_lecture_viewed(&topic).await?;
            println!("Lecture viewed: {}", topic);
            print_outcome(&outcome);
        }
        Commands::Complete { topic, quiz, code } => {
            let topic = TopicId::new(&topic);
            if !store.is_practice_accessible(topic.as_str()) {
                print_locked(&store, &topic);
                return Ok(());
            }
            let outcome = store
                .record_topic_completed(&topic, quiz.map(Score::new), code.map(Score::new))
                .await?;
            println!("Topic completed: {}", topic);
            print_outcome(&outcome);
        }
        Commands::Sync => {
            let outcome = store.refresh().await?;
            print_outcome(&outcome);
        }
        Commands::Logout => {
            if !store.outbox().is_empty() {
                println!("Dropping {} update(s) that never synced", store.outbox().len());
            }
            store.clear().await?;
            println!("Local session cleared");
        }
    }

    Ok(())
}

/// Read `<data_dir>/config.json` if present, then apply env overrides.
async fn load_config(data_dir: &Path) -> Result<SyncConfig> {
    let path = data_dir.join("config.json");
    let config = match tokio::fs::read_to_string(&path).await {
        Ok(json) => SyncConfig::from_json(&json)
            .with_context(|| format!("Invalid config file {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => SyncConfig::default(),
        Err(e) => return Err(e).with_context(|| format!("Cannot read {}", path.display())),
    };
    let config = config.with_env_overrides();
    info!("Using progress API at {}{}", config.api_url, config.api_prefix);
    Ok(config)
}

fn print_locked<L, R>(store: &ProgressStore<L, R>, topic: &TopicId)
where
    L: skillpath_storage::LocalStore,
    R: skillpath_progress::RemoteProgress,
{
    match store.curriculum().previous(topic.as_str()).flatten() {
        Some(previous) => println!("Locked: complete '{}' first", previous),
        None => println!("Locked: '{}' is not in the curriculum", topic),
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Synced => println!("Synced"),
        SyncOutcome::LocalOnly { reason } => println!("Saved locally, will sync later ({})", reason),
    }
}

fn format_state(state: skillpath_progress::TopicState) -> &'static str {
    use skillpath_progress::TopicState;
    match state {
        TopicState::Locked => "LOCKED",
        TopicState::Available => "AVAILABLE",
        TopicState::InProgress => "IN PROGRESS",
        TopicState::Completed => "DONE",
    }
}

fn format_access(open: bool) -> &'static str {
    if open { "unlocked" } else { "locked" }
}
