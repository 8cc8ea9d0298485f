use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use serde_json::Value;
use std::path::{Path, PathBuf};
use switchboard::cli::{Cli, Commands};
use switchboard::{utils, Code, DecisionAgent, ModelRegistry, PromptTemplates, Settings, TransportMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let mut settings = Settings::new()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Discover { urls } => {
            override_urls(&mut settings, urls);
            handle_discover(&settings).await
        }
        Commands::Agents { urls } => {
            override_urls(&mut settings, urls);
            handle_agents(&settings).await
        }
        Commands::Decide {
            question,
            urls,
            called,
            mode,
            templates,
        } => {
            override_urls(&mut settings, urls);
            if let Some(mode) = mode {
                settings.orchestrator.mode = mode;
            }
            handle_decide(&settings, &question, called, templates).await
        }
    };

    if let Err(e) = result {
        let envelope = match e.downcast_ref::<switchboard::Error>() {
            Some(err) => err.envelope(),
            None => Code::new(500, e.to_string()),
        };
        utils::print_envelope(&envelope);
        std::process::exit(1);
    }

    Ok(())
}

fn override_urls(settings: &mut Settings, urls: Vec<String>) {
    if !urls.is_empty() {
        settings.agents.urls = urls;
    }
}

fn build_agent(settings: &Settings) -> Result<DecisionAgent> {
    let api_key = Settings::api_key()?;
    Ok(DecisionAgent::from_settings(settings, api_key)?)
}

async fn handle_discover(settings: &Settings) -> Result<()> {
    utils::print_header("Agent Discovery");
    utils::print_info(&format!("Resolving {} agent URLs...", settings.agents.urls.len()));

    let registry = ModelRegistry::discover(&settings.agents).await?;

    for name in registry.list() {
        utils::print_agent(&*registry.get(&name)?);
    }
    Ok(())
}

async fn handle_agents(settings: &Settings) -> Result<()> {
    let registry = ModelRegistry::discover(&settings.agents).await?;

    println!("{}", registry.agents_prompt());
    Ok(())
}

async fn handle_decide(
    settings: &Settings,
    question: &str,
    called: Option<PathBuf>,
    templates: Option<PathBuf>,
) -> Result<()> {
    let mut agent = build_agent(settings)?;
    if let Some(dir) = templates {
        agent = agent.with_templates(PromptTemplates::from_dir(&dir)?);
    }

    let called_agents = match called {
        Some(path) => Some(load_called_agents(&path)?),
        None => None,
    };

    agent.discover().await?;
    let agents_prompt = agent.agents_prompt().await;

    utils::print_header("Decision");
    let mut decision = agent.respond(question, &agents_prompt, called_agents.as_deref());
    while let Some(chunk) = decision.next().await {
        match agent.mode() {
            TransportMode::Stream => utils::print_token(&chunk),
            TransportMode::Complete => println!("{}", chunk),
        }
    }
    if agent.mode() == TransportMode::Stream {
        println!();
    }
    Ok(())
}

fn load_called_agents(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(entries) => Ok(entries),
        _ => anyhow::bail!("{} must contain a JSON array", path.display()),
    }
}
