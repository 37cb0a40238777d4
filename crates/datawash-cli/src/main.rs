use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;

use datawash::dashboard::{DashboardController, DashboardOptions, DashboardPhase};
use datawash::Endpoints;

#[derive(Parser)]
#[command(name = "datawash", version)]
#[command(about = "Upload a CSV to a DataWash cleaning service and follow the job until it finishes")]
struct Cli {
    /// CSV file to upload
    file: PathBuf,

    /// REST base URL (overrides DATAWASH_API_BASE_URL)
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// WebSocket base URL (overrides DATAWASH_PUSH_BASE_URL)
    #[arg(long, value_name = "URL")]
    push_base: Option<String>,

    /// Run the scripted demo feed if the upload fails
    #[arg(long)]
    demo: bool,

    /// Poll interval in seconds for the pull fallback
    #[arg(long, value_name = "SECONDS", default_value_t = 3)]
    poll_interval: u64,

    /// Print the final dashboard state as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

fn resolve_endpoints(cli: &Cli) -> Result<Endpoints> {
    let defaults = Endpoints::from_env()?;
    let api = cli
        .api_base
        .as_deref()
        .unwrap_or_else(|| defaults.api_base_url());
    let push = cli
        .push_base
        .as_deref()
        .unwrap_or_else(|| defaults.push_base_url());
    Ok(Endpoints::new(api, push)?)
}

async fn run(cli: Cli) -> Result<DashboardPhase> {
    let endpoints = resolve_endpoints(&cli)?;
    let options = DashboardOptions {
        demo_mode: cli.demo,
        poll_interval: Duration::from_secs(cli.poll_interval.max(1)),
        ..DashboardOptions::default()
    };
    let mut controller = DashboardController::new(endpoints, options)?;

    controller.submit_file(&cli.file).await?;
    info!(
        "Tracking job {}",
        controller.job().map(|j| j.id.as_str()).unwrap_or("?")
    );

    let outcome = tokio::select! {
        result = controller.run_to_completion() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let phase = match outcome {
        Some(result) => result?,
        None => {
            info!("Interrupted, closing status stream");
            controller.terminate();
            anyhow::bail!("interrupted before the job finished");
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&controller.render_state())?
        );
    } else {
        print_summary(&controller);
    }
    Ok(phase)
}

fn print_summary(controller: &DashboardController) {
    let state = controller.render_state();
    match state.phase {
        DashboardPhase::Results => {
            println!("Cleaning finished:");
            if let Some(stats) = state.stats {
                println!("  rows processed: {}", stats.rows_processed);
                println!("  issues fixed:   {}", stats.issues_fixed);
                println!("  quality score:  {}%", stats.quality_score);
            }
            if let Some(url) = state.csv_download_url {
                println!("  cleaned csv:    {}", url);
            }
            if let Some(url) = state.report_download_url {
                println!("  report:         {}", url);
            }
        }
        DashboardPhase::Failed => {
            println!(
                "Cleaning failed: {}",
                state.error.as_deref().unwrap_or("unknown error")
            );
        }
        other => println!("Stopped while {}", other),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("datawash=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(DashboardPhase::Results) => {}
        Ok(_) => process::exit(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(1);
        }
    }
}
