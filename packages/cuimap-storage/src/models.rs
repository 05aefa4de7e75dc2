use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
	pub indices: Vec<u32>,
	pub values: Vec<f32>,
}

/// Dense and sparse embeddings of one text column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingPair {
	pub dense: Vec<f32>,
	#[serde(default)]
	pub sparse: SparseVector,
}

/// A data-dictionary entry together with its precomputed embeddings, keyed by column prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
	pub variable_name: String,
	pub search_id: u32,
	pub title: String,
	pub definition: String,
	pub embeddings: BTreeMap<String, EmbeddingPair>,
}

/// Descriptive attributes of a controlled-vocabulary concept.
///
/// Field aliases accept the UMLS column names used by concept exports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptMetadata {
	#[serde(default, alias = "STR")]
	pub title: Option<String>,
	#[serde(default, alias = "DEF")]
	pub definition: Option<String>,
	#[serde(default, alias = "CUI")]
	pub cui: Option<String>,
	#[serde(default, alias = "STY")]
	pub semantic_type: Option<String>,
	#[serde(default, alias = "SAB_MRCONSO")]
	pub source_title: Option<String>,
	#[serde(default, alias = "SAB_MRDEF")]
	pub source_definition: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredConcept {
	pub id: String,
	pub score: f64,
}
