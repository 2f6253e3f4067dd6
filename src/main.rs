use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nedsim::config::Config;
use nedsim::ensemble::{EnsembleAssembler, WeightBudget};
use nedsim::entities::Entities;
use nedsim::logging;
use nedsim::registry::MeasureRegistry;
use nedsim::settings::EnsembleSettings;
use nedsim::tracer::null_tracer;

#[derive(Parser)]
#[command(name = "nedsim", version, about = "Inspect entity-disambiguation similarity settings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parsed settings as JSON, keyed like the settings file
    Show {
        /// Settings file path, or a name inside settings_dir
        settings: String,
    },
    /// Resolve every named scorer against the built-in registry
    Check {
        /// Settings file path, or a name inside settings_dir
        settings: String,
    },
    /// Print the normalized average score from averages.properties
    Average {
        /// Settings file path, or a name inside settings_dir
        settings: String,
    },
}

fn load_settings(config: &Config, arg: &str) -> Result<EnsembleSettings> {
    let path = config.resolve_settings_path(arg);
    EnsembleSettings::from_file(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

fn main() -> Result<()> {
    // 1. Parse CLI args
    let cli = Cli::parse();

    // 2. Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Config error (using defaults): {}", e);
        Config::default()
    });

    // 3. Logging goes to stderr; stdout carries the command output
    logging::init_logging(&config)?;

    match cli.command {
        Commands::Show { settings } => {
            let settings = load_settings(&config, &settings)?;
            println!("{}", serde_json::to_string_pretty(&settings.to_map())?);
        }

        Commands::Check { settings } => {
            let settings = load_settings(&config, &settings)?;
            let registry = MeasureRegistry::builtin();
            let assembler = EnsembleAssembler::new(&settings, &registry);
            let ensemble = assembler.resolve(Arc::new(Entities::new()), null_tracer())?;
            let budget = WeightBudget::of(&settings);

            let report = serde_json::json!({
                "identifier": settings.identifier(),
                "mention_entity": ensemble.mention_entity.len(),
                "entity_entity": ensemble.entity_entity.len(),
                "entity_entity_configured": settings.entity_entity_similarities().len(),
                "importance": ensemble.importance.len(),
                "prior_weight": ensemble.prior_weight(),
                "prior_threshold": ensemble.prior_threshold(),
                "weight_budget": budget,
                "balanced": budget.is_balanced(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Average { settings } => {
            let settings = load_settings(&config, &settings)?;
            println!("{}", settings.normalized_average_score());
        }
    }

    Ok(())
}
