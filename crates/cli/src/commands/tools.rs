//! `stepwise tools`: list what the MCP server offers.

use stepwise_config::AppConfig;
use stepwise_core::session::ToolSession;
use stepwise_mcp::{McpConnector, to_function_tool};

pub async fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.mcp.api_key.is_none() {
        tracing::warn!("No MCP key configured (set AMAP_KEY or STEPWISE_MCP_KEY)");
    }

    let connector = McpConnector::from_config(&config.mcp)?;
    let mut session = connector.connect_sse().await?;
    let tools = session.list_tools().await?;

    if json {
        let records: Vec<_> = tools.iter().map(to_function_tool).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let server = session.server_name().unwrap_or("MCP server");
    println!("{server}: {} tools\n", tools.len());
    for tool in &tools {
        println!("  {:<32} {}", tool.name, tool.description);
    }
    Ok(())
}
