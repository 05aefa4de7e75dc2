pub mod pinecone;

mod error;

pub use error::{Error, Result};

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName};

pub const API_KEY_HEADER: &str = "api-key";

pub fn auth_headers(api_key: &str, default_headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key.parse()?);

	for (key, value) in default_headers {
		headers.insert(HeaderName::from_bytes(key.as_bytes())?, value.parse()?);
	}

	Ok(headers)
}
