use qdrant_client::QdrantError;

/// gRPC codes worth retrying: DEADLINE_EXCEEDED, RESOURCE_EXHAUSTED, ABORTED, INTERNAL and
/// UNAVAILABLE.
const TRANSIENT_GRPC_CODES: [i32; 5] = [4, 8, 10, 13, 14];

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read {path:?}.")]
	Read { path: std::path::PathBuf, source: std::io::Error },
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error("Invalid input: {0}")]
	InvalidInput(String),
	#[error(transparent)]
	Qdrant(#[from] Box<QdrantError>),
}
impl Error {
	/// Whether a Qdrant call may succeed if repeated.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Qdrant(err) => match err.as_ref() {
				QdrantError::ResponseError { status } =>
					TRANSIENT_GRPC_CODES.contains(&(status.code() as i32)),
				QdrantError::ResourceExhaustedError { .. } | QdrantError::Io(_) => true,
				_ => false,
			},
			_ => false,
		}
	}
}

impl From<QdrantError> for Error {
	fn from(err: QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
