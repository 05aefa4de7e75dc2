//! Cross-query rank fusion for one variable.
//!
//! Every concept returned by at least one query becomes a candidate. Candidates are ordered by
//! how many queries returned them, then by their mean score over those queries only, then by
//! the configured tie-break. Ranks are positional: `1..=N` with no gaps.

use std::{cmp::Ordering, collections::HashMap};

use cuimap_config::{MetadataMissPolicy, TieBreak};
use cuimap_storage::models::ConceptMetadata;
use serde::Serialize;

use crate::{Error, MetadataStore, Result, retrieval::QueryMatches};

/// Stands in for descriptive fields of concepts missing from the metadata store.
pub const BLANK_PLACEHOLDER: &str = " ";

#[derive(Debug, Clone, Copy, Default)]
pub struct FusionPolicy {
	pub on_metadata_miss: MetadataMissPolicy,
	pub tie_break: TieBreak,
}
impl From<&cuimap_config::Policy> for FusionPolicy {
	fn from(policy: &cuimap_config::Policy) -> Self {
		Self { on_metadata_miss: policy.on_metadata_miss, tie_break: policy.tie_break }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMetadata {
	pub title: String,
	pub definition: String,
	pub cui: String,
	pub semantic_type: String,
	pub source_title: String,
	pub source_definition: String,
}
impl ResolvedMetadata {
	fn blank() -> Self {
		Self::from_record(ConceptMetadata::default())
	}

	fn from_record(record: ConceptMetadata) -> Self {
		let field = |value: Option<String>| value.unwrap_or_else(|| BLANK_PLACEHOLDER.to_string());

		Self {
			title: field(record.title),
			definition: field(record.definition),
			cui: field(record.cui),
			semantic_type: field(record.semantic_type),
			source_title: field(record.source_title),
			source_definition: field(record.source_definition),
		}
	}
}

/// Rank and score of a candidate within one named query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryHit {
	pub query_name: String,
	/// 0 when the query did not return the candidate.
	pub rank: u32,
	pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
	pub concept_id: String,
	pub metadata: ResolvedMetadata,
	pub overall_count: u32,
	pub average_score: f64,
	pub overall_rank: u32,
	/// One entry per query, in registry order.
	pub per_query: Vec<QueryHit>,
}

struct Tally {
	concept_id: String,
	first_seen: usize,
	count: u32,
	score_sum: f64,
}

/// Fuses per-query matches of one variable into ranked candidates.
///
/// `results` must be in registry order. An empty input yields no candidates.
pub fn aggregate(
	results: &[QueryMatches],
	store: &dyn MetadataStore,
	policy: FusionPolicy,
) -> Result<Vec<Candidate>> {
	let mut tallies: Vec<Tally> = Vec::new();
	let mut position: HashMap<&str, usize> = HashMap::new();

	for query in results {
		for hit in query.matches() {
			match position.get(hit.concept_id.as_str()) {
				Some(idx) => {
					let tally = &mut tallies[*idx];

					tally.count += 1;
					tally.score_sum += hit.score;
				},
				None => {
					position.insert(hit.concept_id.as_str(), tallies.len());
					tallies.push(Tally {
						concept_id: hit.concept_id.clone(),
						first_seen: tallies.len(),
						count: 1,
						score_sum: hit.score,
					});
				},
			}
		}
	}

	let mut ranked = Vec::with_capacity(tallies.len());

	for tally in tallies {
		let metadata = resolve_metadata(store, &tally.concept_id, policy.on_metadata_miss)?;
		let average_score = round3(tally.score_sum / f64::from(tally.count));

		ranked.push((tally.first_seen, Candidate {
			concept_id: tally.concept_id,
			metadata,
			overall_count: tally.count,
			average_score,
			overall_rank: 0,
			per_query: Vec::new(),
		}));
	}

	ranked.sort_by(|(left_seen, left), (right_seen, right)| {
		right
			.overall_count
			.cmp(&left.overall_count)
			.then_with(|| cmp_f64_desc(left.average_score, right.average_score))
			.then_with(|| tie_break(policy.tie_break, results, left, right))
			.then_with(|| left_seen.cmp(right_seen))
	});

	let mut out = Vec::with_capacity(ranked.len());

	for (idx, (_, mut candidate)) in ranked.into_iter().enumerate() {
		candidate.overall_rank = idx as u32 + 1;
		candidate.per_query = results
			.iter()
			.map(|query| QueryHit {
				query_name: query.query_name.clone(),
				rank: query.rank(&candidate.concept_id).unwrap_or(0),
				score: query.score(&candidate.concept_id),
			})
			.collect();

		out.push(candidate);
	}

	Ok(out)
}

/// Rounds to 3 decimals the way Python's `round(value, 3)` does: the exact binary value is
/// rounded to nearest, with exact halves going to the even digit.
pub fn round3(value: f64) -> f64 {
	format!("{value:.3}").parse().unwrap_or(value)
}

pub fn cmp_f64_desc(left: f64, right: f64) -> Ordering {
	right.total_cmp(&left)
}

fn tie_break(
	rule: TieBreak,
	results: &[QueryMatches],
	left: &Candidate,
	right: &Candidate,
) -> Ordering {
	match rule {
		TieBreak::FirstSeen => Ordering::Equal,
		TieBreak::ConceptId => left.concept_id.cmp(&right.concept_id),
		TieBreak::QueryPriority => {
			for query in results {
				let ord =
					rank_asc(query.rank(&left.concept_id), query.rank(&right.concept_id));

				if ord != Ordering::Equal {
					return ord;
				}
			}

			Ordering::Equal
		},
	}
}

fn rank_asc(left: Option<u32>, right: Option<u32>) -> Ordering {
	left.unwrap_or(u32::MAX).cmp(&right.unwrap_or(u32::MAX))
}

fn resolve_metadata(
	store: &dyn MetadataStore,
	concept_id: &str,
	policy: MetadataMissPolicy,
) -> Result<ResolvedMetadata> {
	if let Some(record) = store.lookup(concept_id) {
		return Ok(ResolvedMetadata::from_record(record));
	}

	match policy {
		MetadataMissPolicy::Blank => {},
		MetadataMissPolicy::LogAndBlank => {
			tracing::warn!(concept_id, "Concept is missing from the metadata store.");
		},
		MetadataMissPolicy::Fail => {
			return Err(Error::MetadataMiss { concept_id: concept_id.to_string() });
		},
	}

	Ok(ResolvedMetadata::blank())
}
