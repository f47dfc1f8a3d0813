//! Store tool results as pointers and build bounded context from them.
//!
//! Settings come from `CTXPTR_*` environment variables, overridden by flags.
//! The LLM ranker reads its API key from `OPENROUTER_KEY`.
//!
//! # Examples
//!
//! ```sh
//! # Persist a tool result (read from stdin)
//! curl -s "$SEARCH_URL" | ctxptr save --query-id q1 --tool search --args '{"query":"tokio"}'
//!
//! # List pointers in a scope
//! ctxptr list --query-id q1
//!
//! # Show one pointer with its full result
//! ctxptr show --query-id q1 --pointer-id 3f9a0c21b7de
//!
//! # Pick relevant pointers with the keyword ranker
//! ctxptr select --query-id q1 --query "how does tokio schedule tasks?"
//!
//! # Build the context block with an LLM ranker
//! ctxptr context --query-id q1 --query "how does tokio schedule tasks?" --llm --max-chars 8000
//! ```

use clap::{Args, Parser, Subcommand};
use ctxptr::client::OpenRouterClient;
use ctxptr::prelude::*;
use serde_json::{Map, Value};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Store tool results as pointers and build bounded context from them.
#[derive(Parser)]
#[command(name = "ctxptr")]
struct Cli {
    /// Storage root (overrides CTXPTR_DIR)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Persist a tool result and print its pointer
    Save {
        #[arg(long)]
        query_id: String,

        #[arg(long)]
        task_id: Option<String>,

        /// Name of the tool that produced the result
        #[arg(long)]
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Read the result from this file instead of stdin
        #[arg(long)]
        result_file: Option<PathBuf>,
    },

    /// List pointers saved under a query id, oldest first
    List {
        #[arg(long)]
        query_id: String,
    },

    /// Print one pointer's metadata and full result
    Show {
        #[arg(long)]
        query_id: String,

        #[arg(long)]
        pointer_id: String,
    },

    /// Print the pointers selected as relevant to a query
    Select {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Select relevant pointers and print the formatted context block
    Context {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Character budget (overrides CTXPTR_MAX_CHARS)
        #[arg(long)]
        max_chars: Option<usize>,
    },
}

#[derive(Args)]
struct SelectionArgs {
    #[arg(long)]
    query_id: String,

    /// Query text to judge relevance against
    #[arg(long)]
    query: String,

    /// Rank with a chat model instead of keyword overlap
    #[arg(long)]
    llm: bool,

    /// Ranking model (overrides CTXPTR_SELECTION_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Alternative OpenAI-compatible chat completions endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Maximum pointers to select (overrides CTXPTR_MAX_SELECTED)
    #[arg(long)]
    max_selected: Option<usize>,

    /// Ranker timeout in seconds (overrides CTXPTR_SELECTION_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Report ranker failures as errors instead of selecting nothing
    #[arg(long)]
    fail_open: bool,
}

impl SelectionArgs {
    fn apply(&self, mut config: PointerConfig) -> PointerConfig {
        if let Some(model) = &self.model {
            config = config.with_selection_model(model.clone());
        }
        if let Some(max) = self.max_selected {
            config = config.with_max_selected(max);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_selection_timeout(Duration::from_secs(secs));
        }
        if self.fail_open {
            config = config.with_fail_closed(false);
        }
        config
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn parse_args_object(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("--args must be a JSON object".to_string()),
        Err(e) => Err(format!("--args is not valid JSON: {e}")),
    }
}

/// JSON input is stored as JSON, anything else as a string.
fn parse_result(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

/// Read the result payload from `path`, or stdin when absent.
fn read_result(path: Option<&PathBuf>) -> Result<Value, String> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p)
            .map_err(|e| format!("failed to read result file '{}': {e}", p.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };
    Ok(parse_result(text))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("failed to format output: {e}"))
}

async fn select_with(
    store: &PointerStore,
    config: &PointerConfig,
    args: &SelectionArgs,
) -> Result<Vec<ContextPointer>, String> {
    let candidates = store.list(&args.query_id).map_err(|e| e.to_string())?;

    let client;
    let keyword = KeywordRanker::new();
    let llm;
    let ranker: &dyn Ranker = if args.llm {
        client = match &args.endpoint {
            Some(endpoint) => OpenRouterClient::from_env()?.with_endpoint(endpoint.clone()),
            None => OpenRouterClient::from_env()?,
        };
        llm = LlmRanker::new(&client, config.selector.model());
        &llm
    } else {
        &keyword
    };

    RelevanceSelector::new(ranker, config.selector.clone())
        .select(&args.query, &candidates)
        .await
        .map_err(|e| e.to_string())
}

async fn run(cli: Cli) -> Result<String, String> {
    let mut config = PointerConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(dir) = cli.dir {
        config = config.with_base_dir(dir);
    }
    let store = PointerStore::from_config(&config.store);

    match cli.command {
        Command::Save {
            query_id,
            task_id,
            tool,
            args,
            result_file,
        } => {
            let args = parse_args_object(&args)?;
            let result = read_result(result_file.as_ref())?;
            let pointer = store
                .save(&query_id, task_id.as_deref(), &tool, &args, &result)
                .map_err(|e| e.to_string())?;
            to_json(&pointer)
        }
        Command::List { query_id } => {
            let pointers = store.list(&query_id).map_err(|e| e.to_string())?;
            to_json(&pointers)
        }
        Command::Show {
            query_id,
            pointer_id,
        } => {
            let pointer = store
                .get(&query_id, &pointer_id)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("no pointer {pointer_id} in query {query_id}"))?;
            let result = store.load_result(&pointer).map_err(|e| e.to_string())?;
            to_json(&serde_json::json!({ "pointer": pointer, "result": result }))
        }
        Command::Select { selection } => {
            let config = selection.apply(config);
            let selected = select_with(&store, &config, &selection).await?;
            let rows: Vec<Value> = selected
                .iter()
                .map(|p| serde_json::json!({ "pointer_id": p.pointer_id, "summary": p.summary }))
                .collect();
            to_json(&rows)
        }
        Command::Context {
            selection,
            max_chars,
        } => {
            let mut config = selection.apply(config);
            if let Some(max) = max_chars {
                config = config.with_max_chars(max);
            }
            let selected = select_with(&store, &config, &selection).await?;
            ContextFormatter::new(&store, config.formatter.clone())
                .format(&selected)
                .map_err(|e| e.to_string())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn args_must_be_a_json_object() {
        let map = parse_args_object(r#"{"query":"tokio","limit":5}"#).unwrap();
        assert_eq!(map["query"], json!("tokio"));
        assert_eq!(map["limit"], json!(5));

        assert!(parse_args_object("[1,2]").unwrap_err().contains("JSON object"));
        assert!(parse_args_object("{query").unwrap_err().contains("not valid JSON"));
    }

    #[test]
    fn result_text_is_json_when_it_parses() {
        assert_eq!(parse_result(r#"{"hits": 3}"#.into()), json!({"hits": 3}));
        assert_eq!(parse_result("42\n".into()), json!(42));
        assert_eq!(
            parse_result("<html>page</html>".into()),
            json!("<html>page</html>")
        );
    }

    #[test]
    fn result_file_is_read_and_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        std::fs::write(&path, "plain body").unwrap();
        assert_eq!(read_result(Some(&path)).unwrap(), json!("plain body"));

        let missing = dir.path().join("nope.json");
        assert!(read_result(Some(&missing)).unwrap_err().contains("nope.json"));
    }

    #[test]
    fn selection_flags_override_config() {
        let cli = Cli::try_parse_from([
            "ctxptr",
            "--dir",
            "/tmp/ptrs",
            "context",
            "--query-id",
            "q1",
            "--query",
            "tokio",
            "--max-selected",
            "2",
            "--timeout-secs",
            "7",
            "--model",
            "m/x",
            "--fail-open",
            "--max-chars",
            "500",
        ])
        .unwrap();
        assert_eq!(cli.dir.as_deref(), Some(std::path::Path::new("/tmp/ptrs")));

        let Command::Context { selection, max_chars } = cli.command else {
            panic!("expected context subcommand");
        };
        assert_eq!(max_chars, Some(500));
        let config = selection.apply(PointerConfig::default());
        assert_eq!(config.selector.max_selected, 2);
        assert_eq!(config.selector.timeout, Duration::from_secs(7));
        assert_eq!(config.selector.model(), "m/x");
        assert!(!config.selector.fail_closed);
    }

    #[test]
    fn unset_flags_keep_config() {
        let cli =
            Cli::try_parse_from(["ctxptr", "select", "--query-id", "q1", "--query", "x"]).unwrap();
        let Command::Select { selection } = cli.command else {
            panic!("expected select subcommand");
        };
        let base = PointerConfig::default().with_max_selected(9);
        let config = selection.apply(base);
        assert_eq!(config.selector.max_selected, 9);
        assert!(config.selector.fail_closed);
        assert!(!selection.llm);
    }
}
