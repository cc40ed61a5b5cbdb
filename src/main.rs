use std::path::PathBuf;

use anyhow::Result;
use choromap::config::AppConfig;
use choromap::{pipeline, RegionDataset};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a choropleth map
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "choromap.toml")]
        config: PathBuf,
        /// Write the image here instead of the configured output
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List the columns of a boundary file and the values of one column
    Inspect {
        #[arg(value_name = "BOUNDARY_FILE")]
        path: PathBuf,
        #[arg(short, long)]
        column: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { config, output } => {
            info!(config = %config.display(), "rendering map");
            let mut app_config = AppConfig::load_from_file(&config)?;
            if let Some(output) = output {
                app_config.render.output = output;
            }

            let summary = pipeline::run(&app_config)?;
            println!(
                "Wrote {} ({}x{} px, {} regions, {} labels)",
                app_config.render.output.display(),
                summary.width,
                summary.height,
                summary.polygons,
                summary.labels
            );
            for (a, b) in &summary.overlapping_labels {
                println!("  overlapping labels: {a} / {b}");
            }
        }
        Commands::Inspect { path, column } => {
            let dataset = RegionDataset::load(&path)?;
            println!("{} polygonal records", dataset.len());
            println!("Columns: {}", dataset.columns().join(", "));

            if let Some(column) = column {
                println!("Values of {column}:");
                for (value, count) in dataset.value_counts(&column)? {
                    println!("  {value}: {count}");
                }
            }
        }
    }

    Ok(())
}
