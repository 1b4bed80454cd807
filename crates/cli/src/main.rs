//! Stepwise CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: write the default config file
//! - `agent`: run one request, or read requests from stdin
//! - `gateway`: start the HTTP/WebSocket server
//! - `tools`: list the tools the MCP server advertises
//! - `token`: mint a JWT for the `/ws` endpoint

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Stepwise: plan-execute-observe agent over MCP tools",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Onboard,

    /// Run the agent on a request
    Agent {
        /// Run a single request instead of reading from stdin
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway server
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the tools advertised by the MCP server
    Tools {
        /// Print OpenAI-style tool records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mint a JWT with the configured secret
    Token {
        /// Subject (client id) to embed
        #[arg(long)]
        sub: String,

        /// Lifetime in hours
        #[arg(long, default_value_t = 24)]
        ttl_hours: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Agent { message } => commands::agent::run(message).await?,
        Commands::Gateway { port } => commands::gateway::run(port).await?,
        Commands::Tools { json } => commands::tools::run(json).await?,
        Commands::Token { sub, ttl_hours } => commands::token::run(&sub, ttl_hours)?,
    }

    Ok(())
}
