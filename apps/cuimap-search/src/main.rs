// crates.io
use clap::Parser;
// self
use cuimap_search::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	cuimap_search::run(args).await
}
