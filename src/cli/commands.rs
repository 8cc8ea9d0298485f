use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(author, version, about = "Discover A2A agents and let an LLM pick who answers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the agent cards of every configured agent URL
    Discover {
        /// Agent base URLs (default: agents.urls from config)
        #[arg(short = 'u', long = "url")]
        urls: Vec<String>,
    },

    /// Print the agents prompt built from the discovered cards
    Agents {
        #[arg(short = 'u', long = "url")]
        urls: Vec<String>,
    },

    /// Ask the LLM which agent should answer a question
    Decide {
        question: String,

        #[arg(short = 'u', long = "url")]
        urls: Vec<String>,

        /// JSON file holding an array of agents already called for this question
        #[arg(short = 'c', long)]
        called: Option<PathBuf>,

        /// Transport mode: "complete" or "stream" (default: orchestrator.mode from config)
        #[arg(short = 'm', long)]
        mode: Option<String>,

        /// Directory holding decide.tmpl and agent_answer.tmpl
        #[arg(long)]
        templates: Option<PathBuf>,
    },
}
