use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use clap::Parser;

use cuimap_config::{Alphas, Config};
use cuimap_service::{CandidateTable, MappingService, VectorIndex};
use cuimap_storage::{metadata::MetadataCatalog, variables};

#[derive(Debug, Parser)]
#[command(
	version = cuimap_cli::VERSION,
	rename_all = "kebab",
	styles = cuimap_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON file with the variables and their per-query embeddings.
	#[arg(long, short = 'v', value_name = "FILE")]
	pub variables: PathBuf,
	/// JSON object of concept metadata keyed by concept id.
	#[arg(long, short = 'm', value_name = "FILE")]
	pub metadata: PathBuf,
	/// Writes the candidate table here instead of stdout.
	#[arg(long, short = 'o', value_name = "FILE")]
	pub output: Option<PathBuf>,
	/// Replaces `query.alpha` from the config.
	#[arg(long, value_name = "ALPHA", num_args = 1..)]
	pub alpha: Vec<f32>,
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
	#[arg(long, value_name = "N")]
	pub concurrency: Option<u32>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let mut config = cuimap_config::load(&args.config)?;

	cuimap_cli::init_tracing(&config.service.log_level);

	apply_overrides(&mut config, &args)?;

	let index = cuimap_service::index_from_config(&config)?;
	let table = map_files(config, index, &args.variables, &args.metadata).await?;
	let json = serde_json::to_string_pretty(&table)?;

	match &args.output {
		Some(path) => {
			fs::write(path, format!("{json}\n"))?;

			tracing::info!(path = %path.display(), rows = table.len(), "Wrote candidate table.");
		},
		None => println!("{json}"),
	}

	Ok(())
}

/// Folds command-line overrides into the loaded config.
pub fn apply_overrides(config: &mut Config, args: &Args) -> color_eyre::Result<()> {
	if !args.alpha.is_empty() {
		config.query.alpha = Alphas::Many(args.alpha.clone());
	}
	if let Some(top_k) = args.top_k {
		if top_k == 0 {
			return Err(color_eyre::eyre::eyre!("--top-k must be greater than zero."));
		}

		config.query.top_k = top_k;
	}
	if let Some(concurrency) = args.concurrency {
		if concurrency == 0 {
			return Err(color_eyre::eyre::eyre!("--concurrency must be greater than zero."));
		}

		config.runtime.concurrency = concurrency;
	}

	Ok(())
}

/// Loads the input files and runs the configured alpha sweep against `index`.
pub async fn map_files(
	config: Config,
	index: Arc<dyn VectorIndex>,
	variables_path: &Path,
	metadata_path: &Path,
) -> color_eyre::Result<CandidateTable> {
	let variables = variables::load_variables(variables_path)?;
	let metadata = Arc::new(MetadataCatalog::load(metadata_path)?);
	let alphas = config.query.alpha.clone();
	let service = MappingService::new(config, index, metadata);
	let table = service.sweep(&variables, &alphas).await?;

	Ok(table)
}
