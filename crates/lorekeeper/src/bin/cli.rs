//! Lorekeeper command line
//!
//! Run with: cargo run -p lorekeeper --features cli --bin lorekeeper -- <command>

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};

use lorekeeper::agent::{AgentEvent, AgentStatus, ToolContext};
use lorekeeper::config::LoreConfig;
use lorekeeper::server::AppState;
use lorekeeper::types::History;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lorekeeper", version, about = "Ask questions about your campaign lore")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "LOREKEEPER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the index from the configured campaign
    Ingest,
    /// Answer one question from the indexed notes
    Ask {
        question: String,
        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Include game-master-only notes
        #[arg(long)]
        gm: bool,
    },
    /// Talk to the lore keeper agent; history carries across questions
    Chat {
        /// Include game-master-only notes
        #[arg(long)]
        gm: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lorekeeper=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = LoreConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let state = AppState::new(config).await?;

    match cli.command {
        Command::Ingest => ingest(&state).await,
        Command::Ask { question, top_k, gm } => {
            let top_k = top_k.unwrap_or(state.config().retrieval.top_k);
            let gm = gm || state.config().retrieval.include_gm_only;
            ask(&state, &question, top_k, gm).await
        }
        Command::Chat { gm } => {
            let gm = gm || state.config().retrieval.include_gm_only;
            chat(&state, gm).await
        }
    }
}

async fn ingest(state: &AppState) -> anyhow::Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} documents ({eta})")
            .context("progress template")?
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let report = state
        .ingest_with_progress(|done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        })
        .await?;
    bar.finish_and_clear();

    println!(
        "{} {} documents indexed ({} points), {} empty, in {}ms",
        style("✓").green().bold(),
        report.documents_indexed,
        report.points_written,
        report.documents_empty,
        report.processing_time_ms
    );
    for failure in &report.failures {
        println!(
            "{} {} ({}): {}",
            style("✗").red().bold(),
            failure.title,
            failure.document_id,
            failure.error
        );
    }
    Ok(())
}

async fn ask(state: &AppState, question: &str, top_k: usize, gm: bool) -> anyhow::Result<()> {
    let answer = state.synthesizer().answer(question, top_k, gm).await?;

    println!("{}", answer.answer);
    if !answer.sources.is_empty() {
        println!();
        println!("{}", style("Sources:").bold());
        for source in &answer.sources {
            println!("  - {}", style(source).cyan());
        }
    }
    Ok(())
}

fn print_event(event: AgentEvent) {
    match event {
        AgentEvent::TextDelta { text } => {
            print!("{}", text);
            let _ = std::io::stdout().flush();
        }
        AgentEvent::ToolCallStarted { call } => {
            println!("{}", style(format!("→ {} {}", call.name, call.arguments)).dim());
        }
        AgentEvent::ToolCallResult { name, is_error: true, content, .. } => {
            println!("{}", style(format!("✗ {}: {}", name, content)).yellow());
        }
        AgentEvent::TurnLimitReached { turns, .. } => {
            println!(
                "\n{}",
                style(format!("Stopped after {} turns without a final answer.", turns)).yellow()
            );
        }
        AgentEvent::FinalResult { .. } => println!(),
        AgentEvent::TurnStarted { .. } | AgentEvent::ToolCallResult { .. } => {}
    }
}

async fn chat(state: &AppState, gm: bool) -> anyhow::Result<()> {
    println!(
        "{} Ask about your campaign. Empty line or Ctrl+D to quit.",
        style("Lore keeper").bold().magenta()
    );

    let ctx = ToolContext::new(gm);
    let mut history = History::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", style(">").bold().green());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            break;
        }

        match state
            .agent()
            .run(question, &mut history, &ctx, &print_event)
            .await
        {
            Ok(outcome) if outcome.status == AgentStatus::TurnLimitReached => {
                if let Some(partial) = outcome.answer {
                    println!("{}", partial);
                }
            }
            Ok(_) => {}
            Err(e) => println!("{} {}", style("error:").red().bold(), e),
        }
    }
    Ok(())
}
