use std::{
	collections::{BTreeMap, HashMap, HashSet},
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};

use cuimap_service::BLANK_PLACEHOLDER;

const DEFAULT_K: u32 = 10;

#[derive(Debug, Parser)]
#[command(
	version = cuimap_cli::VERSION,
	rename_all = "kebab",
	styles = cuimap_cli::styles(),
)]
pub struct Args {
	/// Candidate table written by `cuimap-search`.
	#[arg(long, short = 't', value_name = "FILE")]
	pub table: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Cutoff for the @k metrics. Falls back to the dataset's `k`, then 10.
	#[arg(long, value_name = "N")]
	pub k: Option<u32>,
	#[arg(long, value_name = "FILTER", default_value = "info")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	k: Option<u32>,
	expected: Vec<ExpectedMapping>,
}

#[derive(Debug, Deserialize)]
struct ExpectedMapping {
	variable_name: String,
	cuis: Vec<String>,
}

/// The columns of a candidate table row that scoring needs.
#[derive(Debug, Deserialize)]
struct CandidateRecord {
	variable_name: String,
	pipeline_label: String,
	cui: String,
	overall_rank: u32,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	k: u32,
	pipelines: Vec<PipelineReport>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	variable_count: usize,
}

#[derive(Debug, Serialize)]
struct PipelineReport {
	pipeline_label: String,
	summary: EvalSummary,
	variables: Vec<VariableReport>,
}

#[derive(Debug, Serialize)]
struct EvalSummary {
	scored_variables: usize,
	avg_recall_at_k: f64,
	avg_precision_at_k: f64,
	mean_rr: f64,
	map_at_k: f64,
	mean_ndcg: f64,
}

#[derive(Debug, Serialize)]
struct VariableReport {
	variable_name: String,
	expected: Vec<String>,
	predicted_at_k: Vec<String>,
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ap_at_k: f64,
	ndcg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Metrics {
	recall_at_k: f64,
	precision_at_k: f64,
	rr: f64,
	ap_at_k: f64,
	ndcg: f64,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	cuimap_cli::init_tracing(&args.log_level);

	let dataset = load_dataset(&args.dataset)?;
	let rows = load_table(&args.table)?;
	let k = args.k.or(dataset.k).unwrap_or(DEFAULT_K);

	if k == 0 {
		return Err(eyre::eyre!("k must be greater than zero."));
	}

	let pipelines = evaluate(&rows, &dataset, k as usize);

	tracing::info!(rows = rows.len(), pipelines = pipelines.len(), k, "Scored candidate table.");

	let output = EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| "dataset".to_string()),
			variable_count: dataset.expected.len(),
		},
		k,
		pipelines,
	};
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.expected.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one expected mapping."));
	}

	Ok(dataset)
}

fn load_table(path: &Path) -> color_eyre::Result<Vec<CandidateRecord>> {
	let raw = fs::read_to_string(path)?;

	Ok(serde_json::from_str(&raw)?)
}

fn evaluate(rows: &[CandidateRecord], dataset: &EvalDataset, k: usize) -> Vec<PipelineReport> {
	let mut order: Vec<&str> = Vec::new();
	let mut grouped: HashMap<&str, BTreeMap<&str, Vec<&CandidateRecord>>> = HashMap::new();

	for row in rows {
		let label = row.pipeline_label.as_str();

		if !grouped.contains_key(label) {
			order.push(label);
		}

		grouped.entry(label).or_default().entry(row.variable_name.as_str()).or_default().push(row);
	}

	order
		.into_iter()
		.map(|label| {
			let by_variable = &grouped[label];
			let mut variables = Vec::new();

			for mapping in dataset.expected.iter().filter(|mapping| !mapping.cuis.is_empty()) {
				let predicted = by_variable
					.get(mapping.variable_name.as_str())
					.map(|rows| predicted_cuis(rows))
					.unwrap_or_default();
				let expected: HashSet<&str> = mapping.cuis.iter().map(String::as_str).collect();
				let metrics = compute_metrics(&predicted, &expected, k);

				variables.push(VariableReport {
					variable_name: mapping.variable_name.clone(),
					expected: mapping.cuis.clone(),
					predicted_at_k: predicted.iter().take(k).map(|cui| cui.to_string()).collect(),
					recall_at_k: metrics.recall_at_k,
					precision_at_k: metrics.precision_at_k,
					rr: metrics.rr,
					ap_at_k: metrics.ap_at_k,
					ndcg: metrics.ndcg,
				});
			}

			PipelineReport {
				pipeline_label: label.to_string(),
				summary: summarize(&variables),
				variables,
			}
		})
		.collect()
}

/// CUIs of a variable's candidates in rank order, without blanks or repeats.
fn predicted_cuis<'a>(rows: &[&'a CandidateRecord]) -> Vec<&'a str> {
	let mut sorted = rows.to_vec();

	sorted.sort_by_key(|row| row.overall_rank);

	let mut seen = HashSet::new();

	sorted
		.into_iter()
		.map(|row| row.cui.as_str())
		.filter(|cui| *cui != BLANK_PLACEHOLDER && !cui.trim().is_empty())
		.filter(|cui| seen.insert(*cui))
		.collect()
}

fn compute_metrics(predicted: &[&str], expected: &HashSet<&str>, k: usize) -> Metrics {
	let expected_count = expected.len();

	if expected_count == 0 || k == 0 {
		return Metrics { recall_at_k: 0.0, precision_at_k: 0.0, rr: 0.0, ap_at_k: 0.0, ndcg: 0.0 };
	}

	let mut hits_at_k = 0_usize;
	let mut precision_sum = 0.0_f64;
	let mut dcg = 0.0_f64;

	for (idx, cui) in predicted.iter().take(k).enumerate() {
		if expected.contains(cui) {
			let rank = idx + 1;

			hits_at_k += 1;
			precision_sum += hits_at_k as f64 / rank as f64;
			dcg += 1.0 / (rank as f64 + 1.0).log2();
		}
	}

	let rr = predicted
		.iter()
		.position(|cui| expected.contains(cui))
		.map(|idx| 1.0 / (idx + 1) as f64)
		.unwrap_or(0.0);
	let idcg: f64 =
		(1..=expected_count.min(k)).map(|rank| 1.0 / (rank as f64 + 1.0).log2()).sum();

	Metrics {
		recall_at_k: hits_at_k as f64 / expected_count as f64,
		precision_at_k: hits_at_k as f64 / k as f64,
		rr,
		ap_at_k: precision_sum / expected_count as f64,
		ndcg: if idcg > 0.0 { dcg / idcg } else { 0.0 },
	}
}

fn summarize(variables: &[VariableReport]) -> EvalSummary {
	let mean = |value: fn(&VariableReport) -> f64| {
		if variables.is_empty() {
			0.0
		} else {
			variables.iter().map(value).sum::<f64>() / variables.len() as f64
		}
	};

	EvalSummary {
		scored_variables: variables.len(),
		avg_recall_at_k: mean(|report| report.recall_at_k),
		avg_precision_at_k: mean(|report| report.precision_at_k),
		mean_rr: mean(|report| report.rr),
		map_at_k: mean(|report| report.ap_at_k),
		mean_ndcg: mean(|report| report.ndcg),
	}
}
