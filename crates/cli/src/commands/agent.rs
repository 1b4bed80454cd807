//! `stepwise agent`: run requests through the reasoning loop.

use futures::StreamExt;
use std::io::Write;
use stepwise_agent::ReasoningLoop;
use stepwise_config::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_model_key() {
        eprintln!();
        eprintln!("  ERROR: No model API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DASHSCOPE_API_KEY=sk-...");
        eprintln!("    STEPWISE_MODEL_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add model.api_key to {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No model API key found. See above for setup instructions.".into());
    }

    let agent = stepwise_gateway::build_agent(&config).await?;

    if let Some(msg) = message {
        return run_once(&agent, &msg).await;
    }

    println!();
    println!("  Stepwise Agent: interactive mode");
    println!();
    println!("  Model:     {} ({})", config.model.display_name, config.model.name);
    println!("  Tools:     {}", agent.catalog().len());
    println!("  Rounds:    {}", agent.max_rounds());
    println!();
    println!("  Type a request and press Enter. 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        // A failed run is reported and the session continues.
        if let Err(e) = run_once(&agent, line).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}

/// Print every progress event of one run.
async fn run_once(agent: &ReasoningLoop, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut run = agent.run(input);
    while let Some(event) = run.next().await {
        println!("{}", event?);
    }
    Ok(())
}
