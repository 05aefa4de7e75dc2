//! Client for a Pinecone-style hybrid query endpoint.
//!
//! The endpoint scores each stored record with the dot product of the dense query against the
//! stored dense vector plus the dot product of the sparse query against the stored sparse
//! vector, so callers blend the two spaces by scaling the query vectors before sending them.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// One hybrid similarity request against a single namespace.
#[derive(Debug, Clone, Copy)]
pub struct HybridQuery<'a> {
	pub namespace: &'a str,
	pub dense: &'a [f32],
	pub sparse_indices: &'a [u32],
	pub sparse_values: &'a [f32],
	pub top_k: u32,
	pub include_metadata: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
	pub id: String,
	pub score: f64,
}

pub struct PineconeIndex {
	client: Client,
	url: String,
	headers: reqwest::header::HeaderMap,
}
impl PineconeIndex {
	pub fn new(cfg: &cuimap_config::Pinecone) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;

		Ok(Self { client, url: format!("{}{}", cfg.host, cfg.path), headers })
	}

	pub async fn query(&self, query: HybridQuery<'_>) -> Result<Vec<QueryMatch>> {
		let body = build_query_body(&query)?;
		let res = self.client.post(&self.url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;
		let matches = parse_query_response(json)?;

		tracing::debug!(
			namespace = query.namespace,
			top_k = query.top_k,
			matches = matches.len(),
			"Hybrid query returned."
		);

		Ok(matches)
	}
}

fn build_query_body(query: &HybridQuery<'_>) -> Result<Value> {
	if query.sparse_indices.len() != query.sparse_values.len() {
		return Err(Error::InvalidRequest {
			message: "Sparse vector indices and values must have the same length.".to_string(),
		});
	}

	let mut body = serde_json::json!({
		"namespace": query.namespace,
		"vector": query.dense,
		"topK": query.top_k,
		"includeMetadata": query.include_metadata,
		"includeValues": false,
	});

	if !query.sparse_indices.is_empty() {
		body["sparseVector"] = serde_json::json!({
			"indices": query.sparse_indices,
			"values": query.sparse_values,
		});
	}

	Ok(body)
}

fn parse_query_response(json: Value) -> Result<Vec<QueryMatch>> {
	let matches = json.get("matches").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Query response is missing matches array.".to_string() }
	})?;
	let mut out = Vec::with_capacity(matches.len());

	for item in matches {
		let id = item.get("id").and_then(|v| v.as_str()).ok_or_else(|| Error::InvalidResponse {
			message: "Query match is missing id.".to_string(),
		})?;
		let score = item.get("score").and_then(|v| v.as_f64()).ok_or_else(|| {
			Error::InvalidResponse { message: "Query match is missing score.".to_string() }
		})?;

		out.push(QueryMatch { id: id.to_string(), score });
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_service_order() {
		let json = serde_json::json!({
			"namespace": "umls_title",
			"matches": [
				{ "id": "42", "score": 0.91, "metadata": { "CUI": "C0011849" } },
				{ "id": "7", "score": 0.42 }
			]
		});
		let parsed = parse_query_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0].id, "42");
		assert_eq!(parsed[1], QueryMatch { id: "7".to_string(), score: 0.42 });
	}

	#[test]
	fn keeps_full_score_precision() {
		let json = serde_json::json!({ "matches": [{ "id": "1", "score": 0.123456789012345 }] });
		let parsed = parse_query_response(json).expect("parse failed");

		assert_eq!(parsed[0].score, 0.123456789012345);
	}

	#[test]
	fn rejects_missing_matches() {
		let err = parse_query_response(serde_json::json!({})).expect_err("expected error");

		assert!(err.to_string().contains("missing matches"));
	}

	#[test]
	fn omits_empty_sparse_vector() {
		let query = HybridQuery {
			namespace: "umls_title",
			dense: &[0.5, 0.25],
			sparse_indices: &[],
			sparse_values: &[],
			top_k: 3,
			include_metadata: true,
		};
		let body = build_query_body(&query).expect("body failed");

		assert!(body.get("sparseVector").is_none());
		assert_eq!(body["topK"], 3);
		assert_eq!(body["namespace"], "umls_title");
	}

	#[test]
	fn sends_sparse_vector_when_present() {
		let query = HybridQuery {
			namespace: "umls_title_def",
			dense: &[1.0],
			sparse_indices: &[3, 17],
			sparse_values: &[0.5, 0.25],
			top_k: 10,
			include_metadata: false,
		};
		let body = build_query_body(&query).expect("body failed");

		assert_eq!(body["sparseVector"]["indices"], serde_json::json!([3, 17]));
		assert_eq!(body["sparseVector"]["values"], serde_json::json!([0.5, 0.25]));
	}

	#[test]
	fn rejects_misaligned_sparse_vector() {
		let query = HybridQuery {
			namespace: "umls_title",
			dense: &[1.0],
			sparse_indices: &[1, 2],
			sparse_values: &[0.5],
			top_k: 1,
			include_metadata: false,
		};

		assert!(build_query_body(&query).is_err());
	}
}
