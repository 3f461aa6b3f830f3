//! `gongbu chat` — Interactive or single-message tutor chat.

use gongbu_guide::ChatSession;
use gongbu_guide::prompt::DEFAULT_CHAT_PROMPT;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(message: Option<String>, system: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    super::require_api_key(&config)?;

    let provider = super::default_provider(&config)?;
    let system = system.unwrap_or_else(|| DEFAULT_CHAT_PROMPT.to_string());
    let mut session = ChatSession::new(provider, &config.default_model, system)
        .with_temperature(config.guide.chat_temperature)
        .with_max_tokens(Some(config.default_max_tokens));

    if let Some(msg) = message {
        // Single message mode
        eprint!("  Thinking...");
        let reply = session.send(&msg).await;
        eprint!("\r              \r");
        println!("{}", reply?.content);
        return Ok(());
    }

    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    interactive(session).await
}

/// Read questions from stdin until `exit` or end of input.
pub async fn interactive(mut session: ChatSession) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  ╔══════════════════════════════════════╗");
    println!("  ║       Gongbu Tutor — Interactive       ║");
    println!("  ╚══════════════════════════════════════╝");
    println!();
    if let Some(topic) = session.topic() {
        println!("  Topic:     {topic}");
    }
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if line.is_empty() {
            print!("  You > ");
            std::io::stdout().flush()?;
            continue;
        }

        eprint!("  ...");
        match session.send(line).await {
            Ok(reply) => {
                eprint!("\r     \r");
                println!();
                for text in reply.content.lines() {
                    println!("  Tutor > {text}");
                }
                println!();
            }
            Err(e) => {
                eprint!("\r     \r");
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  {} turns this session. Goodbye!", session.transcript().turns().len());
    Ok(())
}
