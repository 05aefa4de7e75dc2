use std::io;

use clap::builder::{
	Styles,
	styling::{AnsiColor, Effects},
};
use tracing_subscriber::EnvFilter;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const FALLBACK_LOG_FILTER: &str = "info";

/// Help and error colors shared by `cuimap-search` and `cuimap-eval`.
pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Cyan.on_default() | Effects::BOLD | Effects::UNDERLINE)
		.usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.literal(AnsiColor::Yellow.on_default())
		.placeholder(AnsiColor::BrightBlack.on_default() | Effects::ITALIC)
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
		.invalid(AnsiColor::Red.on_default())
		.valid(AnsiColor::Green.on_default())
}

/// Installs the stderr log subscriber. Stdout stays reserved for JSON output.
pub fn init_tracing(directives: &str) {
	tracing_subscriber::fmt().with_env_filter(log_filter(directives)).with_writer(io::stderr).init();
}

/// Parses `directives`, falling back to `info` when they do not parse.
pub fn log_filter(directives: &str) -> EnvFilter {
	EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LOG_FILTER))
}
