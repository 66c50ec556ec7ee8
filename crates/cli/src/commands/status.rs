//! `finguru status`: Show the effective configuration.

use finguru_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    println!("💹 FinGuru Status");
    println!("=================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Provider:      {}", config.default_provider);
    println!("  Model:         {}", config.active_model());
    println!("  Temperature:   {}", config.default_temperature);
    println!("  Max tokens:    {}", config.default_max_tokens);
    println!(
        "  Retries:       {} (backoff from {} ms, {} s timeout)",
        config.retry.max_retries, config.retry.initial_backoff_ms, config.retry.request_timeout_secs
    );
    println!(
        "  History:       {} turns kept, {} sent",
        config.session.history_cap, config.session.context_window
    );
    println!("  Gateway:       {}:{}", config.gateway.host, config.gateway.port);
    println!("  FAQ:           {}", if config.faq.enabled { "enabled" } else { "disabled" });
    println!(
        "  API key:       {}",
        if config.has_api_key() { "configured" } else { "missing" }
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `finguru onboard` first");
    }

    Ok(())
}
