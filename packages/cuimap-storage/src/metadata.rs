use std::{collections::HashMap, fs, path::Path};

use crate::{Error, Result, models::ConceptMetadata};

/// Read-only concept metadata addressed by the same identifiers as the vector index.
#[derive(Debug, Default)]
pub struct MetadataCatalog {
	entries: HashMap<String, ConceptMetadata>,
}
impl MetadataCatalog {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;
		let catalog = Self::from_json(&raw)?;

		tracing::info!(path = %path.display(), concepts = catalog.len(), "Loaded concept metadata.");

		Ok(catalog)
	}

	pub fn from_json(raw: &str) -> Result<Self> {
		let entries: HashMap<String, ConceptMetadata> = serde_json::from_str(raw)?;

		Ok(Self { entries })
	}

	pub fn get(&self, concept_id: &str) -> Option<&ConceptMetadata> {
		self.entries.get(concept_id)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
impl FromIterator<(String, ConceptMetadata)> for MetadataCatalog {
	fn from_iter<T: IntoIterator<Item = (String, ConceptMetadata)>>(iter: T) -> Self {
		Self { entries: iter.into_iter().collect() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_umls_column_names() {
		let raw = r#"{
			"0": { "STR": "Diabetes Mellitus", "CUI": "C0011849", "STY": "Disease or Syndrome",
				"SAB_MRCONSO": "MSH", "DEF": "A metabolic disorder.", "SAB_MRDEF": "NCI" },
			"1": { "title": "Glucose", "cui": "C0017725" }
		}"#;
		let catalog = MetadataCatalog::from_json(raw).expect("parse failed");
		let first = catalog.get("0").expect("missing concept 0");

		assert_eq!(catalog.len(), 2);
		assert_eq!(first.title.as_deref(), Some("Diabetes Mellitus"));
		assert_eq!(first.source_definition.as_deref(), Some("NCI"));
		assert_eq!(catalog.get("1").and_then(|m| m.definition.clone()), None);
		assert!(catalog.get("2").is_none());
	}

	#[test]
	fn tolerates_null_fields() {
		let raw = r#"{ "9": { "STR": "Pain", "DEF": null } }"#;
		let catalog = MetadataCatalog::from_json(raw).expect("parse failed");

		assert_eq!(catalog.get("9").and_then(|m| m.definition.clone()), None);
	}
}
