use std::{collections::HashMap, time::Duration};

use cuimap_config::Retry;
use cuimap_storage::models::{ScoredConcept, Variable};

use crate::{Error, IndexQuery, Result, VectorIndex, registry::QueryRegistry, scale};

/// One retrieved hit for a (variable, query) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
	pub concept_id: String,
	pub score: f64,
	/// 1-based position in the list returned by the index.
	pub rank_in_query: u32,
}

/// Ranked matches of one named query, best first.
#[derive(Debug, Clone, Default)]
pub struct QueryMatches {
	pub query_name: String,
	matches: Vec<Match>,
	by_id: HashMap<String, usize>,
}
impl QueryMatches {
	/// Builds the rank and score maps from a best-first hit list. Repeated ids keep their first
	/// position only.
	pub fn from_ranked(query_name: impl Into<String>, hits: Vec<ScoredConcept>) -> Self {
		let mut matches = Vec::with_capacity(hits.len());
		let mut by_id = HashMap::with_capacity(hits.len());

		for (idx, hit) in hits.into_iter().enumerate() {
			if by_id.contains_key(&hit.id) {
				tracing::debug!(concept_id = %hit.id, "Ignoring repeated match within one query.");

				continue;
			}

			by_id.insert(hit.id.clone(), matches.len());
			matches.push(Match { concept_id: hit.id, score: hit.score, rank_in_query: idx as u32 + 1 });
		}

		Self { query_name: query_name.into(), matches, by_id }
	}

	pub fn matches(&self) -> &[Match] {
		&self.matches
	}

	pub fn get(&self, concept_id: &str) -> Option<&Match> {
		self.by_id.get(concept_id).map(|idx| &self.matches[*idx])
	}

	pub fn rank(&self, concept_id: &str) -> Option<u32> {
		self.get(concept_id).map(|m| m.rank_in_query)
	}

	pub fn score(&self, concept_id: &str) -> Option<f64> {
		self.get(concept_id).map(|m| m.score)
	}

	pub fn is_empty(&self) -> bool {
		self.matches.is_empty()
	}
}

/// Issues one hybrid query per registered channel for a variable, in registry order.
pub struct RetrievalRunner<'a> {
	pub index: &'a dyn VectorIndex,
	pub registry: &'a QueryRegistry,
	pub top_k: u32,
	pub include_metadata: bool,
	pub retry: Retry,
}
impl RetrievalRunner<'_> {
	pub async fn run(&self, variable: &Variable, alpha: f32) -> Result<Vec<QueryMatches>> {
		if self.top_k == 0 {
			return Err(Error::InvalidParameter {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let mut out = Vec::with_capacity(self.registry.len());

		for spec in self.registry.specs() {
			let pair = variable.embeddings.get(&spec.embed_column_prefix).ok_or_else(|| {
				Error::MissingEmbedding {
					variable: variable.variable_name.clone(),
					prefix: spec.embed_column_prefix.clone(),
				}
			})?;
			let (dense, sparse) = scale::hybrid_scale(&pair.dense, &pair.sparse, alpha)?;
			let query = IndexQuery {
				namespace: &spec.namespace,
				dense: &dense,
				sparse: &sparse,
				top_k: self.top_k,
				include_metadata: self.include_metadata,
			};
			let hits = self.search_with_retry(query).await.map_err(|err| Error::RetrievalFailure {
				query_name: spec.name.clone(),
				namespace: spec.namespace.clone(),
				message: err.to_string(),
			})?;

			tracing::debug!(
				variable = %variable.variable_name,
				query_name = %spec.name,
				namespace = %spec.namespace,
				matches = hits.len(),
				"Query returned."
			);

			out.push(QueryMatches::from_ranked(spec.name.clone(), hits));
		}

		Ok(out)
	}

	async fn search_with_retry(&self, query: IndexQuery<'_>) -> Result<Vec<ScoredConcept>> {
		let mut attempt = 1;

		loop {
			match self.index.search(query).await {
				Ok(hits) => return Ok(hits),
				Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
					let delay = backoff_delay(&self.retry, attempt);

					tracing::warn!(
						namespace = query.namespace,
						attempt,
						delay_ms = delay.as_millis() as u64,
						error = %err,
						"Index query failed; retrying."
					);
					tokio::time::sleep(delay).await;

					attempt += 1;
				},
				Err(err) => return Err(err),
			}
		}
	}
}

/// Delay before retrying after the `attempt`-th failure: doubles from the initial backoff and
/// is capped at the maximum.
pub fn backoff_delay(retry: &Retry, attempt: u32) -> Duration {
	let shift = attempt.saturating_sub(1).min(31);
	let millis = retry.initial_backoff_ms.saturating_mul(1_u64 << shift).min(retry.max_backoff_ms);

	Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hit(id: &str, score: f64) -> ScoredConcept {
		ScoredConcept { id: id.to_string(), score }
	}

	#[test]
	fn ranks_follow_list_position() {
		let matches =
			QueryMatches::from_ranked("title", vec![hit("c1", 0.9), hit("c2", 0.5), hit("c3", 0.3)]);

		assert_eq!(matches.rank("c1"), Some(1));
		assert_eq!(matches.rank("c3"), Some(3));
		assert_eq!(matches.score("c2"), Some(0.5));
		assert_eq!(matches.rank("c4"), None);
	}

	#[test]
	fn repeated_ids_keep_first_position() {
		let matches =
			QueryMatches::from_ranked("title", vec![hit("c1", 0.9), hit("c2", 0.5), hit("c1", 0.1)]);

		assert_eq!(matches.matches().len(), 2);
		assert_eq!(matches.rank("c1"), Some(1));
		assert_eq!(matches.score("c1"), Some(0.9));
	}

	#[test]
	fn backoff_doubles_until_capped() {
		let retry = Retry { max_attempts: 5, initial_backoff_ms: 100, max_backoff_ms: 350 };

		assert_eq!(backoff_delay(&retry, 1), Duration::from_millis(100));
		assert_eq!(backoff_delay(&retry, 2), Duration::from_millis(200));
		assert_eq!(backoff_delay(&retry, 3), Duration::from_millis(350));
		assert_eq!(backoff_delay(&retry, 40), Duration::from_millis(350));
	}
}
