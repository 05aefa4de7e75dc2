use std::{
	collections::{BTreeMap, HashSet},
	fs,
	path::Path,
};

use serde::Deserialize;

use crate::{
	Error, Result,
	models::{EmbeddingPair, Variable},
};

#[derive(Debug, Deserialize)]
struct VariableFile {
	variables: Vec<VariableRecord>,
}

#[derive(Debug, Deserialize)]
struct VariableRecord {
	variable_name: String,
	search_id: Option<u32>,
	#[serde(default)]
	title: String,
	#[serde(default)]
	definition: String,
	#[serde(default)]
	embeddings: BTreeMap<String, EmbeddingPair>,
}

pub fn load_variables(path: &Path) -> Result<Vec<Variable>> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;
	let variables = parse_variables(&raw)?;

	tracing::info!(path = %path.display(), variables = variables.len(), "Loaded variables.");

	Ok(variables)
}

/// Parses the variable input document. Records without a `search_id` get their 1-based input
/// position.
pub fn parse_variables(raw: &str) -> Result<Vec<Variable>> {
	let file: VariableFile = serde_json::from_str(raw)?;
	let mut names = HashSet::new();
	let mut search_ids = HashSet::new();
	let mut out = Vec::with_capacity(file.variables.len());

	for (idx, record) in file.variables.into_iter().enumerate() {
		if record.variable_name.trim().is_empty() {
			return Err(Error::InvalidInput(format!("Variable at position {} has no name.", idx + 1)));
		}
		if !names.insert(record.variable_name.clone()) {
			return Err(Error::InvalidInput(format!(
				"Variable {} is listed more than once.",
				record.variable_name
			)));
		}

		let search_id = match record.search_id {
			Some(0) => {
				return Err(Error::InvalidInput(format!(
					"Variable {} has search_id 0; search ids start at 1.",
					record.variable_name
				)));
			},
			Some(id) => id,
			None => u32::try_from(idx + 1)
				.map_err(|_| Error::InvalidInput("Too many variables.".to_string()))?,
		};

		if !search_ids.insert(search_id) {
			return Err(Error::InvalidInput(format!(
				"Variable {} reuses search_id {search_id}.",
				record.variable_name
			)));
		}

		for (prefix, pair) in &record.embeddings {
			if pair.sparse.indices.len() != pair.sparse.values.len() {
				return Err(Error::InvalidInput(format!(
					"Variable {} has a {prefix} sparse vector with mismatched indices and values.",
					record.variable_name
				)));
			}
		}

		out.push(Variable {
			variable_name: record.variable_name,
			search_id,
			title: record.title,
			definition: record.definition,
			embeddings: record.embeddings,
		});
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn assigns_positional_search_ids() {
		let raw = r#"{ "variables": [
			{ "variable_name": "AgeYrs", "title": "Age", "definition": "Age in years",
				"embeddings": { "title_def": { "dense": [0.1, 0.2],
					"sparse": { "indices": [4], "values": [0.7] } } } },
			{ "variable_name": "HbA1c" }
		] }"#;
		let variables = parse_variables(raw).expect("parse failed");

		assert_eq!(variables[0].search_id, 1);
		assert_eq!(variables[1].search_id, 2);
		assert_eq!(variables[0].embeddings["title_def"].sparse.indices, vec![4]);
		assert!(variables[1].embeddings.is_empty());
	}

	#[test]
	fn keeps_supplied_search_ids() {
		let raw = r#"{ "variables": [
			{ "variable_name": "A", "search_id": 10 },
			{ "variable_name": "B", "search_id": 3 }
		] }"#;
		let variables = parse_variables(raw).expect("parse failed");

		assert_eq!(variables[0].search_id, 10);
		assert_eq!(variables[1].search_id, 3);
	}

	#[test]
	fn rejects_duplicate_names() {
		let raw = r#"{ "variables": [ { "variable_name": "A" }, { "variable_name": "A" } ] }"#;

		assert!(matches!(parse_variables(raw), Err(Error::InvalidInput(_))));
	}

	#[test]
	fn rejects_colliding_search_ids() {
		let raw = r#"{ "variables": [
			{ "variable_name": "A", "search_id": 2 },
			{ "variable_name": "B" }
		] }"#;

		assert!(matches!(parse_variables(raw), Err(Error::InvalidInput(_))));
	}

	#[test]
	fn rejects_misaligned_sparse_vectors() {
		let raw = r#"{ "variables": [ { "variable_name": "A", "embeddings": {
			"title": { "dense": [1.0], "sparse": { "indices": [1, 2], "values": [0.5] } } } } ] }"#;

		assert!(matches!(parse_variables(raw), Err(Error::InvalidInput(_))));
	}
}
