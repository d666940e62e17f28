//! cade CLI - build a machine design and print what to cut.

use anyhow::{Context, Result};
use cade::designs::{CutList, DesignKind};
use cade::{MachineDimensions, Preset};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cade")]
#[command(about = "Parametric flat-part machine designs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a design and print its cut list
    Build {
        /// Design to build (box, cable-chain)
        design: String,
        /// Preset to start from when no sheet is given
        #[arg(short, long, default_value = "standard")]
        preset: String,
        /// TOML parameter sheet
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the full parameter sheet as TOML
    Dimensions {
        /// Preset to start from when no sheet is given
        #[arg(short, long, default_value = "standard")]
        preset: String,
        /// TOML parameter sheet
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the presets and designs
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            design,
            preset,
            config,
            format,
        } => {
            let dims = load_dimensions(&preset, config.as_ref())?;
            build(&design, &dims, format)?;
        }
        Commands::Dimensions { preset, config } => {
            let dims = load_dimensions(&preset, config.as_ref())?;
            print!("{}", dims.to_toml_string()?);
        }
        Commands::List => {
            println!("presets:");
            for preset in Preset::ALL {
                let open = preset.dimensions().open_area();
                println!(
                    "  {:<10} open area {:.0} x {:.0} x {:.0}",
                    preset.to_string(),
                    open.x,
                    open.y,
                    open.z
                );
            }
            println!("designs:");
            for design in DesignKind::ALL {
                println!("  {design}");
            }
        }
    }

    Ok(())
}

fn load_dimensions(preset: &str, config: Option<&PathBuf>) -> Result<MachineDimensions> {
    match config {
        Some(path) => MachineDimensions::load(path)
            .with_context(|| format!("loading parameter sheet {}", path.display())),
        None => {
            let preset: Preset = preset.parse()?;
            tracing::info!(%preset, "using preset");
            Ok(preset.dimensions())
        }
    }
}

fn build(design: &str, dims: &MachineDimensions, format: Format) -> Result<()> {
    let kind: DesignKind = design.parse()?;
    let assembly = kind
        .build(dims)
        .with_context(|| format!("building {kind}"))?;
    let list = CutList::from_assembly(&assembly);
    tracing::info!(
        design = %kind,
        boards = list.boards.len(),
        hardware = list.hardware.values().sum::<usize>(),
        "built"
    );

    match format {
        Format::Text => print!("{list}"),
        Format::Json => println!("{}", serde_json::to_string_pretty(&list)?),
    }
    Ok(())
}
