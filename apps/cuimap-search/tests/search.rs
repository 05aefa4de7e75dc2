use std::{
	env, fs,
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::{SystemTime, UNIX_EPOCH},
};

use clap::Parser;
use serde_json::{Value, json};

use cuimap_config::Alphas;
use cuimap_search::Args;
use cuimap_testkit::{ScriptedIndex, spec, test_config};

fn write_temp_json(stem: &str, payload: &Value) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("cuimap_search_{stem}_{nanos}_{pid}_{ordinal}.json"));

	fs::write(&path, payload.to_string()).expect("Failed to write test input.");

	path
}

fn embedding(marker: u32) -> Value {
	json!({ "dense": [0.6, 0.8], "sparse": { "indices": [marker], "values": [1.0] } })
}

fn base_args() -> Vec<&'static str> {
	vec!["cuimap-search", "-c", "cuimap.toml", "-v", "variables.json", "-m", "metadata.json"]
}

#[test]
fn parses_inputs_and_overrides() {
	let mut argv = base_args();

	argv.extend(["--alpha", "0.3", "0.7", "--top-k", "25", "-o", "out.json"]);

	let args = Args::try_parse_from(argv).expect("Failed to parse args.");

	assert_eq!(args.config, PathBuf::from("cuimap.toml"));
	assert_eq!(args.variables, PathBuf::from("variables.json"));
	assert_eq!(args.metadata, PathBuf::from("metadata.json"));
	assert_eq!(args.output, Some(PathBuf::from("out.json")));
	assert_eq!(args.alpha, vec![0.3, 0.7]);
	assert_eq!(args.top_k, Some(25));
	assert_eq!(args.concurrency, None);
}

#[test]
fn requires_metadata_file() {
	let err = Args::try_parse_from(["cuimap-search", "-c", "a.toml", "-v", "b.json"])
		.expect_err("Expected missing --metadata.");

	assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn overrides_replace_config_values() {
	let mut argv = base_args();

	argv.extend(["--alpha", "0.1", "--concurrency", "3"]);

	let args = Args::try_parse_from(argv).expect("Failed to parse args.");
	let mut config = test_config(vec![spec("q1", "ns1")], 10);

	cuimap_search::apply_overrides(&mut config, &args).expect("Overrides should apply.");

	assert_eq!(config.query.alpha, Alphas::Many(vec![0.1]));
	assert_eq!(config.query.top_k, 10);
	assert_eq!(config.runtime.concurrency, 3);
}

#[test]
fn zero_top_k_override_is_rejected() {
	let mut argv = base_args();

	argv.extend(["--top-k", "0"]);

	let args = Args::try_parse_from(argv).expect("Failed to parse args.");
	let mut config = test_config(vec![spec("q1", "ns1")], 10);

	assert!(cuimap_search::apply_overrides(&mut config, &args).is_err());
}

#[tokio::test]
async fn maps_files_into_a_candidate_table() {
	let variables_path = write_temp_json(
		"variables",
		&json!({
			"variables": [
				{
					"variable_name": "HbA1c",
					"title": "Hemoglobin A1c",
					"embeddings": { "q1": embedding(1), "q2": embedding(1) }
				},
				{
					"variable_name": "AgeYrs",
					"embeddings": { "q1": embedding(2), "q2": embedding(2) }
				}
			]
		}),
	);
	let metadata_path = write_temp_json(
		"metadata",
		&json!({
			"c1": { "STR": "Hemoglobin A1c measurement", "CUI": "C0474680", "STY": "Laboratory Procedure" }
		}),
	);
	let index = Arc::new(ScriptedIndex::by_namespace(vec![
		("ns1", vec![("c1", 0.9), ("c2", 0.5)]),
		("ns2", vec![("c1", 0.7)]),
	]));
	let mut config = test_config(vec![spec("q1", "ns1"), spec("q2", "ns2")], 5);

	config.query.alpha = Alphas::Many(vec![0.25, 0.75]);

	let table = cuimap_search::map_files(config, index, &variables_path, &metadata_path)
		.await
		.expect("Mapping failed.");

	assert_eq!(table.len(), 8);
	assert_eq!(table.labels().len(), 2);

	let rows = serde_json::to_value(&table).expect("Failed to serialize table.");
	let first = &rows[0];

	assert_eq!(first["variable_name"], "HbA1c");
	assert_eq!(first["search_id"], 1);
	assert_eq!(first["pipeline_label"], "hybrid_semantic_search (custom=test, alpha=0.25)");
	assert_eq!(first["rec_count"], 5);
	assert_eq!(first["result_id"], "c1");
	assert_eq!(first["title"], "Hemoglobin A1c measurement");
	assert_eq!(first["cui"], "C0474680");
	assert_eq!(first["semantic_type"], "Laboratory Procedure");
	assert_eq!(first["definition"], " ");
	assert_eq!(first["overall_count"], 2);
	assert_eq!(first["overall_rank"], 1);
	assert_eq!(first["q1_rank"], 1);
	assert_eq!(first["q2_rank"], 1);
	assert_eq!(rows[1]["result_id"], "c2");
	assert_eq!(rows[1]["q2_rank"], 0);
	assert_eq!(rows[1]["q2_score"], Value::Null);
	assert_eq!(rows[2]["variable_name"], "AgeYrs");
	assert_eq!(rows[2]["search_id"], 2);

	fs::remove_file(variables_path).ok();
	fs::remove_file(metadata_path).ok();
}

#[tokio::test]
async fn missing_variables_file_is_an_error() {
	let metadata_path = write_temp_json("metadata", &json!({}));
	let index = Arc::new(ScriptedIndex::new(|_| Vec::new()));
	let config = test_config(vec![spec("q1", "ns1")], 5);
	let missing = env::temp_dir().join("cuimap_search_does_not_exist.json");

	assert!(cuimap_search::map_files(config, index, &missing, &metadata_path).await.is_err());

	fs::remove_file(metadata_path).ok();
}
