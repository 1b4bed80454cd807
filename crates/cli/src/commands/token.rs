//! `stepwise token`: mint a bearer token for `/ws`.

use std::time::Duration;
use stepwise_config::AppConfig;
use stepwise_gateway::auth::JwtVerifier;

pub fn run(sub: &str, ttl_hours: u64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let verifier = JwtVerifier::from_config(&config.auth)?
        .ok_or("No JWT secret configured (set STEPWISE_JWT_SECRET or auth.secret_key)")?;
    let token = verifier.issue(sub, ttl_from_hours(ttl_hours)?)?;

    println!("{token}");
    Ok(())
}

fn ttl_from_hours(hours: u64) -> Result<Duration, String> {
    hours
        .checked_mul(3600)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("--ttl-hours {hours} is too large"))
}
