use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use reqwest::{Client, Response};

#[derive(Parser)]
#[command(name = "villagerdb-cli")]
#[command(about = "VillagerDB administration CLI", long_about = None)]
struct Cli {
    #[arg(short, long, env = "VILLAGERDB_ENDPOINT", default_value = "http://localhost:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,

    /// Search towns
    Search {
        /// Town name, tag or description text; omit to browse all towns
        #[arg(short, long)]
        query: Option<String>,

        #[arg(short, long)]
        page: Option<u64>,
    },

    /// Start a reindex on the server
    Reindex {
        #[arg(value_enum)]
        mode: ReindexMode,
    },

    /// Delete search index generations that are not live
    Sweep,

    /// Show the live generation and change-log backlog
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReindexMode {
    Full,
    Delta,
}

async fn print_body(response: Response) -> anyhow::Result<()> {
    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .context("Server response was not JSON")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if !status.is_success() {
        bail!("server returned {}", status);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let endpoint = cli.endpoint.trim_end_matches('/');

    let response = match cli.command {
        Commands::Health => client
            .get(format!("{}/health", endpoint))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", endpoint))?,

        Commands::Search { query, page } => {
            let mut params: Vec<(&str, String)> = Vec::new();
            if let Some(q) = query {
                params.push(("q", q));
            }
            if let Some(page) = page {
                params.push(("page", page.to_string()));
            }

            client
                .get(format!("{}/v1/towns/search", endpoint))
                .query(&params)
                .send()
                .await?
        }

        Commands::Reindex { mode } => {
            let path = match mode {
                ReindexMode::Full => "full-reindex",
                ReindexMode::Delta => "delta-reindex",
            };
            client
                .post(format!("{}/v1/admin/search/{}", endpoint, path))
                .send()
                .await?
        }

        Commands::Sweep => {
            client
                .post(format!("{}/v1/admin/search/sweep", endpoint))
                .send()
                .await?
        }

        Commands::Status => {
            client
                .get(format!("{}/v1/admin/search/status", endpoint))
                .send()
                .await?
        }
    };

    print_body(response).await
}
