//! `finguru chat`: Interactive or single-message chat mode.

use finguru_agent::SessionCoordinator;
use finguru_config::AppConfig;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>, user: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    MISTRAL_API_KEY = '...'   (recommended)");
        eprintln!("    FINGURU_API_KEY = '...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = finguru_providers::router::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;
    let coordinator = SessionCoordinator::from_config(provider, &config);
    tracing::debug!(user = %user, model = %coordinator.model(), "Chat session ready");

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = coordinator.handle_turn(&user, &msg).await;
        eprint!("\r              \r");
        println!("{}", reply.response);
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        FinGuru Advisor — Interactive Mode    ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", coordinator.model());
    println!("  Session:   {user}");
    println!();
    println!("  Tell me your age, income, risk appetite and goals.");
    println!("  Type 'profile' to see what I know, 'reset' to start over,");
    println!("  and 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "exit" | "quit" => break,
            "profile" => {
                match coordinator.profile(&user).await {
                    Some(profile) => println!("  {}", serde_json::to_string_pretty(&profile)?),
                    None => println!("  Nothing learned yet."),
                }
                println!();
            }
            "reset" => {
                coordinator.reset(&user).await;
                println!("  Conversation reset.");
                println!();
            }
            _ => {
                eprint!("  ...");
                let reply = coordinator.handle_turn(&user, input).await;
                eprint!("\r     \r");
                println!();
                for line in reply.response.lines() {
                    println!("  FinGuru > {line}");
                }
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Goodbye! 🙏");
    println!();

    Ok(())
}
