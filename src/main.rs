mod analysis;
mod config;
mod extract;
mod geocode;
mod llm;
mod map;
mod pipeline;
mod report;
mod schema;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use config::Config;
use pipeline::{RunContext, RunOutcome, RunParams};

#[derive(Parser)]
#[command(name = "plot_scout", about = "Find and map plots for sale in a city")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Category {
    Residential,
    Commercial,
    Agricultural,
}

impl Category {
    fn as_str(&self) -> &'static str {
        match self {
            Category::Residential => "Residential",
            Category::Commercial => "Commercial",
            Category::Agricultural => "Agricultural",
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Model {
    #[value(name = "o3-mini")]
    O3Mini,
    #[value(name = "gpt-4o")]
    Gpt4o,
}

impl Model {
    fn id(&self) -> &'static str {
        match self {
            Model::O3Mini => "o3-mini",
            Model::Gpt4o => "gpt-4o",
        }
    }
}

#[derive(clap::Args, Clone)]
struct SearchArgs {
    /// City to search in (e.g. Bangalore)
    #[arg(short, long)]
    city: String,
    /// Maximum price in crores
    #[arg(short = 'p', long, default_value = "5.0")]
    max_price: f64,
    /// Plot category
    #[arg(long, value_enum, default_value = "residential")]
    category: Category,
    /// Chat model to use
    #[arg(short, long, value_enum, default_value = "o3-mini")]
    model: Model,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: extract listings, analyze, geocode, render map, trends
    Run {
        #[command(flatten)]
        search: SearchArgs,
        /// Where to write the rendered map
        #[arg(long, default_value = "plots_map.html")]
        map_out: PathBuf,
    },
    /// Extract and analyze listings only (no geocoding or map)
    Find {
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Locality price-trend analysis only
    Trends {
        /// City to analyze
        #[arg(short, long)]
        city: String,
        /// Chat model to use
        #[arg(short, long, value_enum, default_value = "o3-mini")]
        model: Model,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    // Credentials are validated before any network call.
    let config = Config::from_env()?;

    let outcome = match cli.command {
        Commands::Run { search, map_out } => {
            let ctx = RunContext::new(&config, params(&search, map_out.clone()));
            let outcome = ctx.run().await;
            print_report(&outcome);
            print_map(&outcome, &map_out);
            print_trends(&outcome);
            outcome
        }
        Commands::Find { search } => {
            let ctx = RunContext::new(&config, params(&search, PathBuf::new()));
            let outcome = ctx.run_find().await;
            print_report(&outcome);
            outcome
        }
        Commands::Trends { city, model } => {
            let ctx = RunContext::new(
                &config,
                RunParams {
                    city,
                    max_price: 0.0,
                    property_category: String::new(),
                    model: model.id().to_string(),
                    map_out: PathBuf::new(),
                },
            );
            let outcome = ctx.run_trends().await;
            print_trends(&outcome);
            outcome
        }
    };

    if let Some(failure) = &outcome.failure {
        eprintln!("\nRun failed while {}: {}", failure.stage, failure.message);
        eprintln!("Output from earlier stages above is still valid. Re-run to retry.");
        std::process::exit(1);
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn params(search: &SearchArgs, map_out: PathBuf) -> RunParams {
    RunParams {
        city: search.city.clone(),
        max_price: search.max_price,
        property_category: search.category.as_str().to_string(),
        model: search.model.id().to_string(),
        map_out,
    }
}

fn print_report(outcome: &RunOutcome) {
    let Some(report) = &outcome.report else { return };

    println!("=== Recommended Plots ===\n");
    if report.cards_html.is_empty() {
        println!("(no structured cards in this response)\n");
    } else {
        println!("{}\n", report.cards_html);
    }
    println!("{}\n", report.analysis);
}

fn print_map(outcome: &RunOutcome, map_out: &std::path::Path) {
    let Some(map) = &outcome.map else { return };

    println!(
        "Map: {} marker(s), centered at ({:.4}, {:.4}) -> {}",
        map.markers.len(),
        map.center.0,
        map.center.1,
        map_out.display()
    );
}

fn print_trends(outcome: &RunOutcome) {
    if let Some(trends) = &outcome.trend_analysis {
        println!("\n=== Location Trends ===\n");
        println!("{trends}");
    }
    if let Some(insights) = &outcome.area_insights {
        println!("\n=== Area Insights ===\n");
        println!("{insights}");
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
