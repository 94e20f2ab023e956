use sql_assistant::config::AssistantConfig;
use sql_assistant::db::{initialize_database, load_schema, table_row_counts};
use sql_assistant::execution::QueryResult;
use sql_assistant::explain::ExplainOutcome;
use sql_assistant::llm::LlmClient;
use sql_assistant::{AssistantAnswer, SqlAssistant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sql-assistant")]
#[command(about = "Ask natural-language questions over a SQLite dataset")]
#[command(version)]
struct Args {
    /// SQLite database path (or set ASSISTANT_DB_PATH)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Directory of CSV files to ingest (or set ASSISTANT_CSV_DIR)
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,

    /// Directory holding prompt templates (or set ASSISTANT_PROMPTS_DIR)
    #[arg(long, global = true)]
    prompts_dir: Option<PathBuf>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Model identifier (or set OPENAI_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Abort statements running longer than this many milliseconds
    #[arg(long, global = true)]
    statement_timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database from CSV files if it does not exist yet
    Init,
    /// Print the row count of every table
    Check,
    /// Print the schema text sent to the model
    Schema,
    /// Answer a single question
    Ask {
        /// The question in natural language
        question: String,

        /// Regeneration attempts after the first failure
        #[arg(long)]
        max_retries: Option<u32>,

        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask questions interactively until EOF or `exit`; `show <n>` reprints
    /// an earlier answer
    Repl {
        /// Regeneration attempts after the first failure
        #[arg(long)]
        max_retries: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = AssistantConfig::from_env()?;
    apply_overrides(&mut config, &args);

    match args.command {
        Commands::Init => run_init(&config),
        Commands::Check => run_check(&config),
        Commands::Schema => {
            print!("{}", load_schema(&config.db_path)?);
            Ok(())
        }
        Commands::Ask { question, max_retries, json } => {
            if let Some(n) = max_retries {
                config.max_retries = n;
            }
            run_ask(&config, &question, json).await
        }
        Commands::Repl { max_retries } => {
            if let Some(n) = max_retries {
                config.max_retries = n;
            }
            run_repl(&config).await
        }
    }
}

fn apply_overrides(config: &mut AssistantConfig, args: &Args) {
    if let Some(ref path) = args.db_path {
        config.db_path = path.clone();
    }
    if let Some(ref dir) = args.csv_dir {
        config.csv_dir = dir.clone();
    }
    if let Some(ref dir) = args.prompts_dir {
        config.prompts_dir = dir.clone();
    }
    if let Some(ref key) = args.api_key {
        config.llm.api_key = Some(key.clone());
    }
    if let Some(ref model) = args.model {
        config.llm.model = model.clone();
    }
    if let Some(ms) = args.statement_timeout_ms {
        config.statement_timeout = Some(Duration::from_millis(ms));
    }
}

fn run_init(config: &AssistantConfig) -> Result<()> {
    if initialize_database(&config.db_path, &config.csv_dir)? {
        println!("Created {}", config.db_path.display());
    } else {
        println!("{} already exists, nothing to do", config.db_path.display());
    }
    Ok(())
}

fn run_check(config: &AssistantConfig) -> Result<()> {
    for (table, count) in table_row_counts(&config.db_path)? {
        println!("{}: {} rows", table, count);
    }
    Ok(())
}

fn build_assistant(config: &AssistantConfig) -> Result<SqlAssistant> {
    config.require_api_key()?;
    initialize_database(&config.db_path, &config.csv_dir)?;

    let llm = LlmClient::from_config(&config.llm)?;
    Ok(SqlAssistant::new(config, Arc::new(llm))?)
}

async fn run_ask(config: &AssistantConfig, question: &str, json: bool) -> Result<()> {
    let mut assistant = build_assistant(config)?;
    let answer = assistant.ask(question).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }
    Ok(())
}

async fn run_repl(config: &AssistantConfig) -> Result<()> {
    let mut assistant = build_assistant(config)?;
    println!("SQL Assistant started. Type `exit` to quit.\n");

    let stdin = io::stdin();
    loop {
        print!("Ask your data question:\n> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if let Some(number) = parse_show_command(question) {
            match number.checked_sub(1).and_then(|idx| assistant.history().get(idx)) {
                Some(entry) => print_sections(
                    &entry.title,
                    &entry.sql,
                    &entry.result,
                    &entry.explanation,
                ),
                None => println!("\nNo answer #{} in this session.\n", number),
            }
            continue;
        }

        match assistant.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => {
                error!("Question failed: {}", e);
                println!("\n{}\n", e);
            }
        }
    }

    let history = assistant.history();
    if !history.is_empty() {
        println!("\n--- HISTORY ---");
        for (idx, entry) in history.entries().iter().enumerate() {
            println!("{:>2}. [{}] {}", idx + 1, entry.time_label(), entry.title);
        }
    }
    info!("Session ended after {} question(s)", history.query_count());
    Ok(())
}

/// `show <n>` with a 1-based history number.
fn parse_show_command(input: &str) -> Option<usize> {
    let mut parts = input.split_whitespace();
    let command = parts.next()?;
    if !command.eq_ignore_ascii_case("show") {
        return None;
    }
    let number = parts.next()?.parse::<usize>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(number)
}

fn print_answer(answer: &AssistantAnswer) {
    print_sections(&answer.title, &answer.sql, &answer.result, &answer.explanation);
    if answer.attempts > 1 {
        println!("(SQL succeeded on attempt {})\n", answer.attempts);
    }
}

fn print_sections(title: &str, sql: &str, result: &QueryResult, explanation: &ExplainOutcome) {
    println!("\n=== {} ===", title);

    println!("\n--- GENERATED SQL ---");
    println!("{}", sql);

    println!("\n--- QUERY RESULT ---");
    if result.is_empty() {
        println!("No results returned.");
    } else {
        println!("{}", result.to_text_table());
    }

    println!("\n--- EXPLANATION ---");
    match explanation {
        ExplainOutcome::NoData(message) => println!("{}", message),
        ExplainOutcome::Explained(record) => {
            println!("Key Insights:");
            for insight in &record.insights {
                println!("  • {}", insight);
            }
            println!("Recommendations:");
            for rec in &record.recommendations {
                println!("  • {}", rec);
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_command() {
        assert_eq!(parse_show_command("show 2"), Some(2));
        assert_eq!(parse_show_command("  SHOW   1 "), Some(1));
        assert_eq!(parse_show_command("show"), None);
        assert_eq!(parse_show_command("show me the top sellers"), None);
        assert_eq!(parse_show_command("show 2 3"), None);
        assert_eq!(parse_show_command("How many orders?"), None);
    }
}
