pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid parameter: {message}")]
	InvalidParameter { message: String },
	#[error("Variable {variable} has no embeddings for column prefix {prefix}.")]
	MissingEmbedding { variable: String, prefix: String },
	#[error("Retrieval failed for query {query_name} in namespace {namespace}: {message}")]
	RetrievalFailure { query_name: String, namespace: String, message: String },
	#[error("No metadata found for concept {concept_id}.")]
	MetadataMiss { concept_id: String },
	#[error("Variable {variable} produced no matches.")]
	EmptyResultSet { variable: String },
	/// A failure of the index service that may clear up if the call is repeated.
	#[error("Index unavailable: {message}")]
	Unavailable { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl Error {
	/// Whether the retrieval runner should repeat the call that produced this error.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Unavailable { .. })
	}
}

impl From<cuimap_providers::Error> for Error {
	fn from(err: cuimap_providers::Error) -> Self {
		if err.is_transient() {
			Self::Unavailable { message: err.to_string() }
		} else {
			Self::Provider { message: err.to_string() }
		}
	}
}

impl From<cuimap_storage::Error> for Error {
	fn from(err: cuimap_storage::Error) -> Self {
		match err {
			cuimap_storage::Error::InvalidInput(message) => Self::InvalidParameter { message },
			other if other.is_transient() => Self::Unavailable { message: other.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
