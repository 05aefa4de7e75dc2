use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::fusion::Candidate;

/// A fused candidate tagged with the variable and the alpha pass that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
	pub variable_name: String,
	pub search_id: u32,
	pub pipeline_label: String,
	pub alpha: f32,
	/// `top_k` requested from every query of the pass.
	pub rec_count: u32,
	pub candidate: Candidate,
}
impl Serialize for CandidateRow {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let candidate = &self.candidate;
		let metadata = &candidate.metadata;
		let mut map = serializer.serialize_map(Some(14 + candidate.per_query.len() * 2))?;

		map.serialize_entry("variable_name", &self.variable_name)?;
		map.serialize_entry("search_id", &self.search_id)?;
		map.serialize_entry("pipeline_label", &self.pipeline_label)?;
		map.serialize_entry("rec_count", &self.rec_count)?;
		map.serialize_entry("result_id", &candidate.concept_id)?;
		map.serialize_entry("title", &metadata.title)?;
		map.serialize_entry("definition", &metadata.definition)?;
		map.serialize_entry("cui", &metadata.cui)?;
		map.serialize_entry("semantic_type", &metadata.semantic_type)?;
		map.serialize_entry("source_title", &metadata.source_title)?;
		map.serialize_entry("source_definition", &metadata.source_definition)?;
		map.serialize_entry("overall_count", &candidate.overall_count)?;
		map.serialize_entry("average_score", &candidate.average_score)?;
		map.serialize_entry("overall_rank", &candidate.overall_rank)?;

		for hit in &candidate.per_query {
			map.serialize_entry(&format!("{}_rank", hit.query_name), &hit.rank)?;
			map.serialize_entry(&format!("{}_score", hit.query_name), &hit.score)?;
		}

		map.end()
	}
}

/// Rows of every alpha pass, concatenated in pass order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTable {
	pub query_names: Vec<String>,
	pub rows: Vec<CandidateRow>,
}
impl CandidateTable {
	pub fn new(query_names: Vec<String>) -> Self {
		Self { query_names, rows: Vec::new() }
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Distinct pipeline labels in first-appearance order.
	pub fn labels(&self) -> Vec<&str> {
		let mut labels: Vec<&str> = Vec::new();

		for row in &self.rows {
			if !labels.contains(&row.pipeline_label.as_str()) {
				labels.push(&row.pipeline_label);
			}
		}

		labels
	}

	pub fn rows_for_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a CandidateRow> {
		self.rows.iter().filter(move |row| row.pipeline_label == label)
	}
}
impl Serialize for CandidateTable {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.rows.serialize(serializer)
	}
}
