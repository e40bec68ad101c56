//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pdfqa_core::{
    HistoryStore, LibsqlHistory, LiveCollaborators, OrchestratorSettings, ProgressReporter,
    QUERY_PHASE, QueryOrchestrator,
};
use pdfqa_shared::{
    Answer, AppConfig, Credential, IndexOutcome, IndexStatus, SessionId, SessionInput,
    init_config, load_config, load_config_from,
};
use pdfqa_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pdfqa: ask questions about PDF documents.
#[derive(Parser)]
#[command(
    name = "pdfqa",
    version,
    about = "Index a PDF into a vector store and ask questions about it.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.pdfqa/pdfqa.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Index the PDF if needed, then answer a question about it.
    Ask {
        /// Chat model API key.
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, default_value = "")]
        api_key: String,

        /// Database URL (libsql://, https://, file: or a path).
        #[arg(long, env = "PDFQA_DB_URL", default_value = "")]
        db_url: String,

        /// PDF to answer from (defaults to the configured pdf_url).
        #[arg(long)]
        pdf_url: Option<String>,

        /// Continue an earlier chat session.
        #[arg(long)]
        session: Option<SessionId>,

        /// Print the answer as it is generated.
        #[arg(long)]
        stream: bool,

        /// The question.
        #[arg(default_value = "")]
        question: String,
    },

    /// Index the PDF without asking anything.
    Index {
        /// API key; also used for embeddings when they are served by the chat provider.
        #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, default_value = "")]
        api_key: String,

        /// Database URL (libsql://, https://, file: or a path).
        #[arg(long, env = "PDFQA_DB_URL", default_value = "")]
        db_url: String,

        /// PDF to index (defaults to the configured pdf_url).
        #[arg(long)]
        pdf_url: Option<String>,

        /// Drop the collection and index from scratch.
        #[arg(long)]
        recreate: bool,
    },

    /// List chat sessions, or show one session's turns.
    History {
        /// Database URL (libsql://, https://, file: or a path).
        #[arg(long, env = "PDFQA_DB_URL")]
        db_url: String,

        /// Session to show.
        #[arg(long)]
        session: Option<SessionId>,

        /// Maximum turns to show for a session.
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pdfqa=info",
        1 => "pdfqa=debug",
        _ => "pdfqa=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Ask {
            api_key,
            db_url,
            pdf_url,
            session,
            stream,
            question,
        } => {
            let config = resolve_config(config_path.as_ref())?;
            let pdf_url = pdf_url.unwrap_or_else(|| config.defaults.pdf_url.clone());
            let mut input = SessionInput::new(api_key, db_url, pdf_url, question);
            if let Some(session) = session {
                input = input.with_session(session);
            }
            cmd_ask(config, input, stream).await
        }
        Command::Index {
            api_key,
            db_url,
            pdf_url,
            recreate,
        } => {
            let config = resolve_config(config_path.as_ref())?;
            let pdf_url = pdf_url.unwrap_or_else(|| config.defaults.pdf_url.clone());
            cmd_index(config, Credential::new(api_key), &db_url, &pdf_url, recreate).await
        }
        Command::History {
            db_url,
            session,
            limit,
        } => {
            let config = resolve_config(config_path.as_ref())?;
            cmd_history(&config, &db_url, session, limit).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_ref()).await,
        },
    }
}

fn resolve_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ask(config: AppConfig, input: SessionInput, stream: bool) -> Result<()> {
    let mut settings = OrchestratorSettings::from(&config);
    settings.stream = stream;

    let mut collaborators = LiveCollaborators::new(config);
    if stream {
        collaborators = collaborators.with_delta_sink(Arc::new(|delta: &str| {
            let mut out = std::io::stdout().lock();
            let _ = out.write_all(delta.as_bytes());
            let _ = out.flush();
        }));
    }
    let orchestrator = QueryOrchestrator::new(collaborators, settings);

    info!(source = %input.document_source, stream, "asking");
    let reporter = CliProgress::new(stream);
    let answer = match orchestrator.handle_submission_with(input, &reporter).await {
        Ok(answer) => answer,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    if stream {
        println!();
    } else {
        println!("{}", answer.text);
    }
    eprintln!();
    eprintln!("  Session: {}", answer.session_id);
    eprintln!("  Time:    {:.1}s", answer.elapsed.as_secs_f64());
    Ok(())
}

async fn cmd_index(
    config: AppConfig,
    credential: Credential,
    db_url: &str,
    pdf_url: &str,
    recreate: bool,
) -> Result<()> {
    let settings = OrchestratorSettings::from(&config);
    let orchestrator = QueryOrchestrator::new(LiveCollaborators::new(config), settings);

    let reporter = CliProgress::new(false);
    let outcomes = orchestrator
        .index_document(&credential, db_url, pdf_url, recreate, &reporter)
        .await;
    reporter.spinner.finish_and_clear();

    for outcome in outcomes? {
        print_outcome(&outcome);
    }
    Ok(())
}

async fn cmd_history(
    config: &AppConfig,
    db_url: &str,
    session: Option<SessionId>,
    limit: usize,
) -> Result<()> {
    let storage = Storage::connect(db_url).await?;
    let history = LibsqlHistory::open(storage, &config.defaults.history_table).await?;

    match session {
        Some(session) => {
            let turns = history.recent_turns(&session, limit).await?;
            if turns.is_empty() {
                return Err(eyre!("no turns recorded for session {session}"));
            }
            for turn in turns {
                println!("[{}] {}", turn.created_at.format("%Y-%m-%d %H:%M:%S"), turn.model);
                println!("Q: {}", turn.question);
                println!("A: {}", turn.answer);
                println!();
            }
        }
        None => {
            let sessions = history.sessions().await?;
            if sessions.is_empty() {
                println!("No chat sessions in '{}'.", history.table());
                return Ok(());
            }
            println!("  {:<36}  {:>5}  LAST ACTIVITY", "SESSION", "TURNS");
            for s in sessions {
                println!(
                    "  {:<36}  {:>5}  {}",
                    s.session_id,
                    s.turns,
                    s.last_activity.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&PathBuf>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_outcome(outcome: &IndexOutcome) {
    match outcome.status {
        IndexStatus::Indexed { chunks } => {
            println!("  indexed   {} ({chunks} chunks)", outcome.source_url)
        }
        IndexStatus::AlreadyIndexed => println!("  unchanged {}", outcome.source_url),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    /// Clear the spinner before the answer streams onto stdout.
    streaming: bool,
}

impl CliProgress {
    fn new(streaming: bool) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner, streaming }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        if self.streaming && name == QUERY_PHASE {
            self.spinner.finish_and_clear();
            return;
        }
        self.spinner.set_message(name.to_string());
    }

    fn indexed(&self, outcomes: &[IndexOutcome]) {
        for outcome in outcomes {
            if let IndexStatus::Indexed { chunks } = outcome.status {
                self.spinner
                    .println(format!("  indexed {} ({chunks} chunks)", outcome.source_url));
            }
        }
    }

    fn done(&self, _answer: &Answer) {
        self.spinner.finish_and_clear();
    }
}
