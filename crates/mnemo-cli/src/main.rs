// ============================================================================
// mnemo — CLI front-end for the long-term memory store
// ============================================================================
// Usage:
//   mnemo search "query" [--limit 10]     Search user+project scopes
//   mnemo add "content" [--scope project] Store a new memory (scrubbed)
//   mnemo list [--limit 20]               Show recent project memories
//   mnemo delete <memory-id>              Delete one memory
//   mnemo clear [--scope project]         Delete every memory in a scope
//   mnemo status                          Show configuration snapshot
//   mnemo refresh                         Repopulate the injection cache
// ============================================================================

use anyhow::{anyhow, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use mnemo_core::{Config, MemoryAction, MemoryArgs, MemoryItem, MemoryPlugin, MemoryScope};

/// Long-term memory store inspection tool
#[derive(Parser)]
#[command(name = "mnemo", version, about = "Inspect and manage the long-term memory store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search user and project scopes by relevance
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Store a new memory (secrets are scrubbed first)
    Add {
        /// Memory content
        content: String,

        /// Target scope: user or project
        #[arg(long, default_value = "project")]
        scope: String,
    },

    /// List recent project memories
    List {
        /// Maximum number of results
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Delete a memory by id
    Delete {
        /// Memory id as shown by search/list
        memory_id: String,
    },

    /// Delete every memory in a scope
    Clear {
        /// Target scope: user or project
        #[arg(long, default_value = "project")]
        scope: String,
    },

    /// Show plugin configuration and cache stats
    Status,

    /// Repopulate the injection cache
    Refresh,
}

fn parse_scope(s: &str) -> Result<MemoryScope> {
    s.parse::<MemoryScope>().map_err(|e| anyhow!(e))
}

/// Render an ISO-8601 timestamp for table output
fn format_timestamp(ts: Option<&str>) -> String {
    ts.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_memory_table(memories: &[MemoryItem]) {
    if memories.is_empty() {
        println!("No memories found.");
        return;
    }

    println!("{:<36}  {:<7}  {:<17}  {}", "ID", "SCORE", "UPDATED", "MEMORY");
    println!("{}", "-".repeat(90));

    for item in memories {
        let score = item
            .score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        let preview: String = item.memory.chars().take(60).collect();
        println!(
            "{:<36}  {:<7}  {:<17}  {}",
            item.id,
            score,
            format_timestamp(item.updated_at.as_deref().or(item.created_at.as_deref())),
            preview
        );
    }

    println!("\nTotal: {} memories", memories.len());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let worktree = std::env::current_dir()
        .ok()
        .map(|p| p.to_string_lossy().into_owned());
    let config = Config::from_env(worktree.as_deref());

    let plugin = MemoryPlugin::init(config)
        .ok_or_else(|| anyhow!("Memory plugin disabled (set MNEMO_API_KEY and MNEMO_ENABLED)"))?;

    match cli.command {
        Commands::Search { query, limit } => {
            let memories = plugin.service().search(&query, limit).await;
            print_memory_table(&memories);
        }

        Commands::Add { content, scope } => {
            let scope = parse_scope(&scope)?;
            let response = plugin
                .tool_memory(MemoryArgs {
                    action: MemoryAction::Add,
                    query: Some(content),
                    memory_id: None,
                    scope: Some(scope),
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::List { limit } => {
            let memories = plugin.service().get_recent(limit).await;
            print_memory_table(&memories);
        }

        Commands::Delete { memory_id } => {
            let response = plugin
                .tool_memory(MemoryArgs {
                    action: MemoryAction::Delete,
                    query: None,
                    memory_id: Some(memory_id),
                    scope: None,
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Clear { scope } => {
            let scope = parse_scope(&scope)?;
            let response = plugin
                .tool_memory(MemoryArgs {
                    action: MemoryAction::Clear,
                    query: None,
                    memory_id: None,
                    scope: Some(scope),
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Status => {
            let response = plugin.tool_memory_status();
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Refresh => {
            let response = plugin.tool_memory_refresh().await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
