//! gazette-post - filter, tag and compose news candidates into postable posts
//!
//! Reads a JSON array of candidate articles on stdin and writes the postable
//! set on stdout. Fetching candidates and publishing the results are other
//! tools' jobs.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use libgazette::logging::{LogFormat, LoggingConfig};
use libgazette::spans::extract_spans;
use libgazette::{
    Article, Config, GazetteError, History, MemoryHistory, Pipeline, PostableArticle, Result,
    SqliteHistory,
};

#[derive(Parser, Debug)]
#[command(name = "gazette-post")]
#[command(about = "Filter, tag and compose news candidates into postable posts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file path (defaults to the XDG location; missing file means
    /// built-in defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the history database path from the config
    #[arg(long)]
    history: Option<String>,

    /// Use an empty in-memory history and record nothing
    #[arg(long)]
    dry_run: bool,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Log output format (text, json, pretty)
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit the configured word lists and write the config file back
    Words {
        #[command(subcommand)]
        action: WordsAction,
    },
}

#[derive(Subcommand, Debug)]
enum WordsAction {
    /// Add words to a list, skipping case-insensitive duplicates
    Add {
        list: WordList,
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// Remove words from a list, matching case-insensitively
    Remove {
        list: WordList,
        #[arg(required = true)]
        words: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum WordList {
    Bad,
    Good,
    SuperBad,
}

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse();

    let log_format: LogFormat = match cli.log_format.parse() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(3);
        }
    };
    LoggingConfig::new(log_format, "info".to_string(), cli.verbose).init();

    let result = match cli.command.take() {
        Some(Command::Words { action }) => run_words(&cli, action),
        None => run(cli).await,
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Apply a word-list edit to the config file and write it back.
///
/// A missing file starts from built-in defaults, so the first edit also
/// creates the config.
fn run_words(cli: &Cli, action: WordsAction) -> Result<()> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => libgazette::config::resolve_config_path()?,
    };
    let mut config = if path.exists() {
        Config::load_from_path(&path)?
    } else {
        Config::default_config()
    };

    config.filter = match &action {
        WordsAction::Add { list, words } => match list {
            WordList::Bad => config.filter.adding_bad_words(words),
            WordList::Good => config.filter.adding_good_words(words),
            WordList::SuperBad => config.filter.adding_super_bad_words(words),
        },
        WordsAction::Remove { list, words } => match list {
            WordList::Bad => config.filter.removing_bad_words(words),
            WordList::Good => config.filter.removing_good_words(words),
            WordList::SuperBad => config.filter.removing_super_bad_words(words),
        },
    };

    config.validate()?;
    config.save_to_path(&path)?;
    info!(
        bad = config.filter.bad_words.len(),
        good = config.filter.good_words.len(),
        super_bad = config.filter.super_bad_words.len(),
        config = %path.display(),
        "word lists updated"
    );
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| GazetteError::InvalidInput(format!("failed to read stdin: {}", e)))?;
    if input.trim().is_empty() {
        return Err(GazetteError::InvalidInput(
            "no candidates on stdin (expected a JSON array of articles)".to_string(),
        ));
    }

    let candidates: Vec<Article> = serde_json::from_str(&input)
        .map_err(|e| GazetteError::InvalidInput(format!("failed to parse candidates: {}", e)))?;

    let history: Arc<dyn History> = if cli.dry_run {
        Arc::new(MemoryHistory::new())
    } else {
        let db_path = cli.history.as_deref().unwrap_or(&config.database.path);
        Arc::new(SqliteHistory::new(db_path).await?)
    };

    let pipeline = Pipeline::new(&config, history);
    let postable = pipeline.run(candidates).await?;

    match cli.format.as_str() {
        "json" => print_json(&postable)?,
        "text" => print_text(&postable),
        other => {
            return Err(GazetteError::InvalidInput(format!(
                "unknown output format '{}' (expected text or json)",
                other
            )))
        }
    }

    Ok(())
}

/// Load config from an explicit path, the XDG location, or fall back to
/// built-in defaults when no file exists.
fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load_from_path(path);
    }
    let default_path = libgazette::config::resolve_config_path()?;
    if default_path.exists() {
        Config::load_from_path(&default_path)
    } else {
        Ok(Config::default_config())
    }
}

fn print_json(postable: &[PostableArticle]) -> Result<()> {
    let entries: Vec<serde_json::Value> = postable
        .iter()
        .map(|p| {
            serde_json::json!({
                "article": p.article,
                "post": p.post,
                "spans": extract_spans(&p.post.text),
            })
        })
        .collect();
    let rendered = serde_json::to_string_pretty(&entries)
        .map_err(|e| GazetteError::InvalidInput(format!("failed to serialize output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

fn print_text(postable: &[PostableArticle]) {
    for p in postable {
        println!("{}", p.article.link);
        println!("{}", p.post.text);
        println!();
    }
}
