pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidRequest { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Whether the same request may succeed later: transport failures, timeouts, throttling and
	/// server-side statuses. Malformed requests, client-side statuses and bad responses are not.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Reqwest(err) => match err.status() {
				Some(status) =>
					status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS,
				None => err.is_timeout() || err.is_connect() || err.is_request(),
			},
			_ => false,
		}
	}
}
