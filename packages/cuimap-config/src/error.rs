use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cannot read cuimap config {}.", path.display())]
	Read { path: PathBuf, source: std::io::Error },
	#[error("Cannot parse cuimap config {}: {source}", path.display())]
	Parse { path: PathBuf, source: toml::de::Error },
	/// The index API key is empty in the file and its fallback variable is unset.
	#[error("index.pinecone.api_key must be non-empty or provided through {env_var}.")]
	MissingCredential { env_var: String },
	#[error("{message}")]
	Validation { message: String },
}
