//! `stepwise onboard`: first-time setup.

use stepwise_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("Stepwise: first-time setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set DASHSCOPE_API_KEY (or model.api_key) for the model");
    println!("   2. Set AMAP_KEY (or mcp.api_key) for the MCP server");
    println!("   3. Run: stepwise agent -m \"上海今天天气怎么样\"\n");

    Ok(())
}
