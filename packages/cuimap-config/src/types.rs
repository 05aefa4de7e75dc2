use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub index: Index,
	pub query: Query,
	#[serde(default)]
	pub pipeline: Pipeline,
	#[serde(default)]
	pub policy: Policy,
	#[serde(default)]
	pub retry: Retry,
	#[serde(default)]
	pub runtime: Runtime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
	Pinecone,
	Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	pub backend: IndexBackend,
	pub pinecone: Option<Pinecone>,
	pub qdrant: Option<Qdrant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pinecone {
	pub host: String,
	#[serde(default = "default_pinecone_path")]
	pub path: String,
	#[serde(default)]
	pub api_key: String,
	#[serde(default = "default_pinecone_api_key_env")]
	pub api_key_env: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	#[serde(default = "default_dense_vector")]
	pub dense_vector: String,
	#[serde(default = "default_sparse_vector")]
	pub sparse_vector: String,
	#[serde(default = "default_namespace_field")]
	pub namespace_field: String,
	/// Each leg fetches `top_k * candidate_pool_factor` points before hybrid rescoring.
	#[serde(default = "default_candidate_pool_factor")]
	pub candidate_pool_factor: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Query {
	pub top_k: u32,
	pub alpha: Alphas,
	#[serde(default = "default_true")]
	pub include_metadata: bool,
	pub specs: Vec<QuerySpec>,
}

/// A single blend coefficient or a sweep over several.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Alphas {
	One(f32),
	Many(Vec<f32>),
}
impl Alphas {
	pub fn to_vec(&self) -> Vec<f32> {
		match self {
			Self::One(alpha) => vec![*alpha],
			Self::Many(alphas) => alphas.clone(),
		}
	}
}
impl From<f32> for Alphas {
	fn from(alpha: f32) -> Self {
		Self::One(alpha)
	}
}
impl From<Vec<f32>> for Alphas {
	fn from(alphas: Vec<f32>) -> Self {
		Self::Many(alphas)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuerySpec {
	pub name: String,
	pub embed_column_prefix: String,
	pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	pub name: String,
	pub custom_config: String,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self { name: "hybrid_semantic_search".to_string(), custom_config: "default".to_string() }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataMissPolicy {
	#[default]
	Blank,
	LogAndBlank,
	Fail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultPolicy {
	#[default]
	Drop,
	LogAndDrop,
	Fail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalFailurePolicy {
	#[default]
	Abort,
	SkipVariable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
	/// Stable with respect to the order concepts were first returned.
	#[default]
	FirstSeen,
	ConceptId,
	/// Per-query ranks compared in registry order.
	QueryPriority,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Policy {
	pub on_metadata_miss: MetadataMissPolicy,
	pub on_empty_result: EmptyResultPolicy,
	pub on_retrieval_failure: RetrievalFailurePolicy,
	pub tie_break: TieBreak,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Retry {
	pub max_attempts: u32,
	pub initial_backoff_ms: u64,
	pub max_backoff_ms: u64,
}
impl Default for Retry {
	fn default() -> Self {
		Self { max_attempts: 1, initial_backoff_ms: 200, max_backoff_ms: 5_000 }
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Runtime {
	pub concurrency: u32,
}
impl Default for Runtime {
	fn default() -> Self {
		Self { concurrency: 1 }
	}
}

fn default_pinecone_path() -> String {
	"/query".to_string()
}

fn default_pinecone_api_key_env() -> String {
	"PINECONE_API_KEY".to_string()
}

fn default_dense_vector() -> String {
	"dense".to_string()
}

fn default_sparse_vector() -> String {
	"sparse".to_string()
}

fn default_namespace_field() -> String {
	"namespace".to_string()
}

fn default_candidate_pool_factor() -> u32 {
	4
}

fn default_true() -> bool {
	true
}
