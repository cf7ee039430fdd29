use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use events::{FinalResultData, ProgressChannel, ProgressEvent, ProgressItem};
use orchestrator::JudgeSystem;
use server::config::{AppConfig, CONFIG_FILE};
use server::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PROGRESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "forensics-studio")]
#[command(about = "Multi-agent image authenticity analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Args, Default)]
struct Overrides {
    /// Reasoning model, e.g. google/gemini-2.5-flash
    #[arg(long)]
    model: Option<String>,

    /// Upper bound on judge system debate rounds
    #[arg(long)]
    max_rounds: Option<u32>,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(model) = &self.model {
            config.reasoning.model = model.clone();
        }
        if let Some(max_rounds) = self.max_rounds {
            config.debate.max_rounds = max_rounds;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Start the HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Analyze one image in-process and print its progress
    Analyze {
        /// Local path or http(s) URL of the image
        #[arg(long)]
        img: String,

        /// Caption or context posted with the image
        #[arg(long)]
        text: Option<String>,

        /// Print the final result as JSON instead of a summary
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        overrides: Overrides,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Init { force }) => init_config(&cli.config, force).await,
        Some(Commands::Serve { port, overrides }) => serve(&cli.config, port, &overrides).await,
        Some(Commands::Analyze {
            img,
            text,
            json,
            overrides,
        }) => analyze(&cli.config, &img, text, json, &overrides).await,
        None => serve(&cli.config, None, &Overrides::default()).await,
    }
}

async fn load_config(path: &Path, overrides: &Overrides) -> AppConfig {
    let mut config = AppConfig::read(path).await;
    overrides.apply(&mut config);
    config
}

async fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Run 'forensics-studio init --force' to overwrite it.");
        return Ok(());
    }

    let config = AppConfig::default();
    config
        .write(path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} Wrote {}", "✓".green(), path.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Export {} with your OpenRouter API key",
        config.reasoning.api_key_env
    );
    println!(
        "  2. Export {} to enable reverse image search",
        config.reverse_search.api_key_env
    );
    println!("  3. Run 'forensics-studio serve' or 'forensics-studio analyze --img <path>'");

    Ok(())
}

async fn serve(config_path: &Path, port: Option<u16>, overrides: &Overrides) -> Result<()> {
    let config = load_config(config_path, overrides).await;
    let port = port.unwrap_or(config.server.port);

    let pipeline = config.build_pipeline()?;
    tracing::info!(steps = ?pipeline.step_names(), "Pipeline ready");

    let mut state = AppState::new(pipeline).with_heartbeat_interval(Duration::from_secs(
        config.server.heartbeat_secs.max(1),
    ));
    if let Some(app_dir) = &config.server.app_dir {
        tracing::info!("Serving frontend from {}", app_dir.display());
        state = state.with_app_dir(app_dir.clone());
    }

    println!();
    println!("Forensics Studio");
    println!("════════════════════════════════════════");
    println!();
    println!("  API Server:  http://localhost:{}", port);
    println!("  Swagger UI:  http://localhost:{}/swagger-ui", port);
    println!("  Model:       {}", config.reasoning.model);
    println!("  Max rounds:  {}", config.debate.max_rounds);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    server::serve(state, port).await
}

async fn analyze(
    config_path: &Path,
    image: &str,
    text: Option<String>,
    json: bool,
    overrides: &Overrides,
) -> Result<()> {
    let config = load_config(config_path, overrides).await;
    let pipeline = Arc::new(config.build_pipeline()?);
    let channel = ProgressChannel::new();

    let run = pipeline.start(&channel, image, text).await;
    let mut final_result = None;

    loop {
        match channel.recv_timeout(PROGRESS_POLL_INTERVAL).await {
            ProgressItem::Event(envelope) => {
                if !json {
                    print_event(&envelope.event);
                }
                let terminal = envelope.event.is_terminal();
                if let ProgressEvent::FinalResult(data) = envelope.event {
                    final_result = Some(data);
                }
                if terminal {
                    break;
                }
            }
            // A run that died without a terminal event has nothing left to send
            ProgressItem::Heartbeat if run.handle.is_finished() => break,
            ProgressItem::Heartbeat => {}
        }
    }

    run.handle.await.context("Analysis task failed")??;

    if let Some(data) = final_result {
        if json {
            println!("{}", serde_json::to_string_pretty(&data)?);
        } else {
            print_verdict(&data);
        }
    }

    Ok(())
}

fn print_event(event: &ProgressEvent) {
    match event {
        ProgressEvent::Start { total_steps, .. } => {
            println!("{} Analysis started ({} steps)", "▶".cyan(), total_steps)
        }
        ProgressEvent::StepStart {
            display_name,
            step_number,
            total_steps,
            ..
        } => println!(
            "{} {}...",
            format!("[{}/{}]", step_number, total_steps).dimmed(),
            display_name
        ),
        ProgressEvent::StepComplete { display_name, .. } => {
            println!("  {} {}", "✓".green(), display_name)
        }
        ProgressEvent::StepError {
            display_name,
            error,
            ..
        } => println!("  {} {}: {}", "✗".red(), display_name, error),
        ProgressEvent::FinalAnalysisStart { message } => println!("{} {}", "▶".cyan(), message),
        ProgressEvent::FinalResult(_) => {}
        ProgressEvent::Complete { message } => println!("{} {}", "●".green(), message),
        ProgressEvent::Error { error } => eprintln!("{} {}", "✗".red().bold(), error),
    }
}

fn print_verdict(data: &FinalResultData) {
    println!();
    println!("Verdict");
    println!("════════════════════════════════════════");

    match data.probability_score {
        Some(score) => {
            let label = format!("{}% likely AI-generated or manipulated", score);
            let label = if score >= 70 {
                label.red().bold()
            } else if score <= 30 {
                label.green().bold()
            } else {
                label.yellow().bold()
            };
            println!("  {}", label);
        }
        None => println!("  {}", "No probability score returned".yellow()),
    }

    if let Some(verdict) = data
        .full_context
        .result_from(JudgeSystem::NAME)
        .and_then(|judge| judge.content.get("final_verdict"))
        .and_then(|verdict| verdict.as_str())
    {
        println!("  Debate verdict: {}", verdict);
    }

    if let Some(explanation) = &data.explanation {
        println!();
        println!("  {}", explanation);
    }
    if data.raw_output {
        println!();
        println!("  {}", "(unstructured model output)".dimmed());
    }
    println!();
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forensics_studio=info,server=info,orchestrator=info,reasoning=info,tower_http=info"
                    .into()
            }),
        )
        .init();
}
