//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dailyvocab_core::checkpoint::Checkpoint;
use dailyvocab_core::completion::OpenRouterClient;
use dailyvocab_core::pipeline::{
    ProgressReporter, RunOutcome, RunReport, resume_pending, run_daily,
};
use dailyvocab_shared::{
    AppConfig, RunConfig, WORD_COLUMN, expand_home, init_config, load_config,
};
use dailyvocab_storage::{SheetStore, TabularStore};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// dailyvocab — a fresh batch of vocabulary words every day.
#[derive(Parser)]
#[command(
    name = "dailyvocab",
    version,
    about = "Generate daily vocabulary words with video prompts and captions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Store and checkpoint overrides shared by several commands.
#[derive(clap::Args, Default)]
pub(crate) struct StoreArgs {
    /// Path to the vocabulary database (overrides config).
    #[arg(long, env = "DAILYVOCAB_STORE")]
    pub store: Option<String>,

    /// Sheet name inside the database (overrides config).
    #[arg(long)]
    pub sheet: Option<String>,

    /// Checkpoint file path (overrides config).
    #[arg(long)]
    pub checkpoint: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate today's words and save them, or finish a previously failed save.
    Run {
        /// Number of new words to generate.
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Model ID to use (overrides config).
        #[arg(short, long)]
        model: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// List the most recently stored words.
    List {
        /// How many words to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Inspect or discard a pending checkpoint.
    Checkpoint {
        #[command(subcommand)]
        action: CheckpointAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Checkpoint subcommands.
#[derive(Subcommand)]
pub(crate) enum CheckpointAction {
    /// Show the words waiting to be saved.
    Show {
        /// Checkpoint file path (overrides config).
        #[arg(long)]
        checkpoint: Option<String>,
    },
    /// Delete the checkpoint. Its words are lost.
    Discard {
        /// Checkpoint file path (overrides config).
        #[arg(long)]
        checkpoint: Option<String>,
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

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = format!(
        "dailyvocab={level},dailyvocab_core={level},dailyvocab_storage={level},dailyvocab_shared={level}"
    );

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            count,
            model,
            store,
        } => cmd_run(count, model, &store).await,
        Command::List { limit, store } => cmd_list(limit, &store).await,
        Command::Checkpoint { action } => match action {
            CheckpointAction::Show { checkpoint } => cmd_checkpoint_show(checkpoint).await,
            CheckpointAction::Discard { checkpoint } => cmd_checkpoint_discard(checkpoint).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Apply CLI overrides on top of the loaded config.
fn apply_overrides(config: &mut AppConfig, store: &StoreArgs) {
    if let Some(path) = &store.store {
        config.store.path = path.clone();
    }
    if let Some(sheet) = &store.sheet {
        config.store.sheet = sheet.clone();
    }
    if let Some(checkpoint) = &store.checkpoint {
        config.run.checkpoint_path = checkpoint.clone();
    }
}

async fn open_store(config: &AppConfig) -> Result<SheetStore> {
    let path = expand_home(&config.store.path)?;
    Ok(SheetStore::open(&path, &config.store.sheet).await?)
}

fn checkpoint_for(override_path: Option<String>) -> Result<Checkpoint> {
    let config = load_config()?;
    let path = override_path.unwrap_or(config.run.checkpoint_path);
    Ok(Checkpoint::new(PathBuf::from(path)))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(count: Option<usize>, model: Option<String>, store: &StoreArgs) -> Result<()> {
    let mut config = load_config()?;
    apply_overrides(&mut config, store);
    if let Some(count) = count {
        config.run.target_count = count;
    }
    if let Some(model) = model {
        config.openrouter.default_model = model;
    }

    let reporter = CliProgress::new();
    let result = execute_run(&config, &reporter).await;
    reporter.finish();
    let report = result?;

    // Print summary
    println!();
    match report.outcome {
        RunOutcome::NothingGenerated => {
            println!("  No new unique words were generated. Nothing saved.");
            println!("  Attempts: {}", report.attempts);
        }
        RunOutcome::Resumed => {
            println!("  Restored a previous batch from the checkpoint and saved it.");
            println!("  Saved:    {}", report.saved_words.len());
            if report.already_stored > 0 {
                println!("  Skipped:  {} (already stored)", report.already_stored);
            }
            print_words(&report);
        }
        RunOutcome::Saved => {
            println!("  Vocabulary saved!");
            println!("  Saved:    {} of {}", report.saved_words.len(), report.requested);
            println!("  Attempts: {}", report.attempts);
            if report.shortfall() > 0 {
                println!("  Warning:  {} words short of the target", report.shortfall());
            }
            if report.enrichment.failures() > 0 {
                println!(
                    "  Warning:  {} video prompts/captions could not be generated",
                    report.enrichment.failures()
                );
            }
            print_words(&report);
        }
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Save a pending checkpoint if there is one, otherwise run a fresh generation.
///
/// The API key is only resolved for a fresh run, before the store is opened.
async fn execute_run(config: &AppConfig, progress: &dyn ProgressReporter) -> Result<RunReport> {
    let run_config = RunConfig::from(config);
    run_config.validate()?;

    if Checkpoint::new(&run_config.checkpoint_path).load().is_some() {
        let sheet = open_store(config).await?;
        info!(sheet = sheet.sheet(), "saving pending checkpoint");
        if let Some(report) = resume_pending(&run_config, &sheet, progress).await? {
            return Ok(report);
        }
    }

    // Fail fast on missing credentials, before touching the store.
    let completion = OpenRouterClient::from_config(config)?;
    let sheet = open_store(config).await?;

    info!(
        count = run_config.target_count,
        model = completion.model(),
        sheet = sheet.sheet(),
        "starting daily run"
    );

    Ok(run_daily(&run_config, &sheet, &completion, progress).await?)
}

fn print_words(report: &RunReport) {
    if !report.saved_words.is_empty() {
        println!("  Words:    {}", report.saved_words.join(", "));
    }
}

async fn cmd_list(limit: usize, store: &StoreArgs) -> Result<()> {
    let mut config = load_config()?;
    apply_overrides(&mut config, store);
    let sheet = open_store(&config).await?;

    let words: Vec<String> = sheet
        .read_column(WORD_COLUMN)
        .await?
        .into_iter()
        .skip(1)
        .filter(|w| !w.trim().is_empty())
        .collect();

    info!(total = words.len(), sheet = sheet.sheet(), "listing stored words");

    if words.is_empty() {
        println!("No words stored in '{}' yet.", sheet.sheet());
        return Ok(());
    }

    let start = words.len().saturating_sub(limit);
    for word in &words[start..] {
        println!("  {word}");
    }
    println!();
    println!("  Showing {} of {} words.", words.len() - start, words.len());
    Ok(())
}

async fn cmd_checkpoint_show(path: Option<String>) -> Result<()> {
    let checkpoint = checkpoint_for(path)?;
    if !checkpoint.exists() {
        println!("No pending checkpoint at '{}'.", checkpoint.path().display());
        return Ok(());
    }

    match checkpoint.load() {
        Some(batch) => {
            println!(
                "Pending checkpoint at '{}' with {} words:",
                checkpoint.path().display(),
                batch.len()
            );
            for item in &batch {
                println!("  {} = {} [{}]", item.word, item.translation, item.level);
            }
            println!();
            println!("Run `dailyvocab run` to save them.");
        }
        None => {
            println!(
                "Checkpoint at '{}' is empty or unreadable and will be ignored.",
                checkpoint.path().display()
            );
        }
    }
    Ok(())
}

async fn cmd_checkpoint_discard(path: Option<String>) -> Result<()> {
    let checkpoint = checkpoint_for(path)?;
    if !checkpoint.exists() {
        return Err(eyre!(
            "no checkpoint found at '{}'",
            checkpoint.path().display()
        ));
    }
    checkpoint.clear()?;
    println!("Discarded checkpoint '{}'.", checkpoint.path().display());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("[{current}/{total}] {detail}"));
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dailyvocab_core::pipeline::SilentProgress;
    use dailyvocab_shared::VocabularyItem;
    use uuid::Uuid;

    /// Config rooted in a fresh temp dir, with an API key variable nobody sets.
    fn isolated_config() -> (AppConfig, PathBuf) {
        let dir = std::env::temp_dir().join(format!("dv_cli_{}", Uuid::now_v7()));
        let mut config = AppConfig::default();
        config.store.path = dir.join("vocabulary.db").display().to_string();
        config.run.checkpoint_path = dir.join("backup_vocab.json").display().to_string();
        config.openrouter.api_key_env = format!("DAILYVOCAB_UNSET_KEY_{}", Uuid::now_v7().simple());
        (config, dir)
    }

    fn item(word: &str) -> VocabularyItem {
        VocabularyItem {
            word: word.into(),
            translation: format!("{word} in English"),
            level: "A1".into(),
            video_prompt: format!("prompt for {word}"),
            video_caption: format!("caption for {word}"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn pending_checkpoint_is_saved_without_api_key() {
        let (config, _dir) = isolated_config();
        let checkpoint = Checkpoint::new(&config.run.checkpoint_path);
        checkpoint.save(&[item("talo"), item("kala")]).unwrap();

        let report = execute_run(&config, &SilentProgress)
            .await
            .expect("resume needs no credentials");

        assert_eq!(report.outcome, RunOutcome::Resumed);
        assert_eq!(report.saved_words, ["talo", "kala"]);
        assert!(!checkpoint.exists());

        let sheet = open_store(&config).await.unwrap();
        let words = sheet.read_column(WORD_COLUMN).await.unwrap();
        assert_eq!(words[1..], ["talo", "kala"]);
    }

    #[tokio::test]
    async fn fresh_run_without_api_key_fails_before_opening_store() {
        let (config, dir) = isolated_config();

        let err = execute_run(&config, &SilentProgress).await.unwrap_err();

        assert!(err.to_string().contains("API key"));
        assert!(!dir.join("vocabulary.db").exists());
    }

    #[test]
    fn cli_parses_run_overrides() {
        let cli = Cli::parse_from([
            "dailyvocab",
            "-v",
            "run",
            "--count",
            "3",
            "--sheet",
            "Swedish",
            "--checkpoint",
            "/tmp/ckpt.json",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Run { count, store, .. } => {
                assert_eq!(count, Some(3));
                assert_eq!(store.sheet.as_deref(), Some("Swedish"));
                assert_eq!(store.checkpoint.as_deref(), Some("/tmp/ckpt.json"));
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let mut config = AppConfig::default();
        let args = StoreArgs {
            store: Some("/tmp/v.db".into()),
            sheet: None,
            checkpoint: Some("pending.json".into()),
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.store.path, "/tmp/v.db");
        assert_eq!(config.store.sheet, "Daily Vocabulary");
        assert_eq!(config.run.checkpoint_path, "pending.json");
    }

    #[test]
    fn checkpoint_subcommand_parses() {
        let cli = Cli::parse_from(["dailyvocab", "checkpoint", "discard"]);
        assert!(matches!(
            cli.command,
            Command::Checkpoint {
                action: CheckpointAction::Discard { checkpoint: None }
            }
        ));
    }
}
