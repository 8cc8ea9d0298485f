use crate::core::a2a::AgentCard;
use crate::error::Code;
use colored::*;
use std::io::Write;

pub fn print_header(text: &str) {
    println!("\n{}", text.bright_cyan().bold());
    println!("{}", "=".repeat(text.chars().count()).bright_cyan());
}

pub fn print_info(text: &str) {
    println!("{}", text.blue());
}

/// Failures go to stderr as the `{code, message}` envelope
pub fn print_envelope(code: &Code) {
    if code.is_success() {
        println!("{}", code.json().green());
    } else {
        eprintln!("{}", code.json().red().bold());
    }
}

pub fn print_agent(card: &AgentCard) {
    let version = card.version.as_deref().unwrap_or("-");
    println!("{} {}", card.name.green().bold(), format!("({})", version).dimmed());
    if !card.description.is_empty() {
        println!("  {}", card.description);
    }
    if let Some(url) = &card.url {
        println!("  {}", url.blue());
    }
    for skill in &card.skills {
        println!("  {} {}", "-".yellow(), skill.name);
    }
}

/// Write a streamed token without a newline
pub fn print_token(token: &str) {
    print!("{}", token);
    let _ = std::io::stdout().flush();
}
