use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use tokio_util::sync::CancellationToken;

use kubepilot::agent::{Agent, AgentConfig};
use kubepilot::facade;
use kubepilot::providers::{configs::ProviderConfig, factory};
use kubepilot::tools::ToolRegistry;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kubepilot", version, about = "Kubernetes Copilot powered by LLMs")]
struct Cli {
    /// Model to use
    #[arg(short = 'm', long, global = true, default_value = "gpt-4")]
    model: String,

    /// Max tokens for the model
    #[arg(short = 't', long, global = true, default_value_t = 2048)]
    max_tokens: usize,

    /// Max iterations for the agent running
    #[arg(short = 'x', long, global = true, default_value_t = 10)]
    max_iterations: usize,

    /// Print tokens count
    #[arg(short = 'c', long, global = true)]
    count_tokens: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute operations based on prompt instructions
    Execute {
        /// Instructions to execute
        #[arg(long)]
        instructions: Option<String>,

        /// Instructions as positional words when --instructions is absent
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();

    match cli.command {
        Command::Execute {
            ref instructions,
            ref args,
        } => {
            let instructions = instructions
                .clone()
                .unwrap_or_else(|| args.join(" "));
            if instructions.trim().is_empty() {
                eprintln!("{}", style("Please provide the instructions").red());
                std::process::exit(1);
            }
            run_execute(&cli, &instructions).await;
        }
    }

    Ok(())
}

async fn run_execute(cli: &Cli, instructions: &str) {
    let provider = match ProviderConfig::from_env(None, None).and_then(factory::get_provider) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("{}", style(err).red());
            std::process::exit(1);
        }
    };

    let config = AgentConfig {
        model: cli.model.clone(),
        max_tokens: cli.max_tokens,
        max_iterations: cli.max_iterations,
        count_tokens: cli.count_tokens,
        verbose: cli.verbose,
    };
    let agent = Agent::new(provider, Arc::new(ToolRegistry::with_defaults()), config);

    // Ctrl-C aborts before the next model call and kills any running tool.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    match facade::execute(&agent, instructions, cancel).await {
        Ok(outcome) => {
            if outcome.truncated {
                eprintln!(
                    "{}",
                    style("Max iterations reached; the answer below may be incomplete").yellow()
                );
            }
            println!("{}", outcome.answer);
            if cli.count_tokens {
                let total = agent.history_tokens(&outcome.history);
                println!("{}", style(format!("Total tokens: {}", total)).green());
            }
        }
        Err(err) => {
            eprintln!("{}", style(err).red());
            std::process::exit(1);
        }
    }
}
