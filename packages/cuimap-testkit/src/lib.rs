//! In-memory stand-ins for the vector index and the metadata store.

use std::{
	collections::{BTreeMap, HashMap, HashSet},
	sync::{
		Arc, Mutex, MutexGuard,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use cuimap_config::{
	Alphas, Config, Index, IndexBackend, Pinecone, Pipeline, Policy, Query, QuerySpec, Retry,
	Runtime, Service,
};
use cuimap_service::{BoxFuture, Error, IndexQuery, Result, VectorIndex};
use cuimap_storage::{
	metadata::MetadataCatalog,
	models::{ConceptMetadata, EmbeddingPair, ScoredConcept, SparseVector, Variable},
};

/// A query as the index received it, after alpha scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
	pub namespace: String,
	pub dense: Vec<f32>,
	pub sparse: SparseVector,
	pub top_k: u32,
}

type Responder = dyn Fn(&RecordedQuery) -> Vec<ScoredConcept> + Send + Sync;
type Delay = dyn Fn(&RecordedQuery) -> Duration + Send + Sync;

/// Answers queries from a closure and records every call.
///
/// Namespaces can be told to fail transiently a number of times before answering, or to reject
/// every call. Replies can be delayed per query to make concurrent callers finish out of order.
pub struct ScriptedIndex {
	responder: Box<Responder>,
	delay: Option<Box<Delay>>,
	calls: Mutex<Vec<RecordedQuery>>,
	failures: Mutex<HashMap<String, u32>>,
	rejections: Mutex<HashSet<String>>,
	in_flight: AtomicUsize,
	peak_in_flight: AtomicUsize,
}
impl ScriptedIndex {
	pub fn new<F>(responder: F) -> Self
	where
		F: Fn(&RecordedQuery) -> Vec<ScoredConcept> + Send + Sync + 'static,
	{
		Self {
			responder: Box::new(responder),
			delay: None,
			calls: Mutex::new(Vec::new()),
			failures: Mutex::new(HashMap::new()),
			rejections: Mutex::new(HashSet::new()),
			in_flight: AtomicUsize::new(0),
			peak_in_flight: AtomicUsize::new(0),
		}
	}

	/// Answers every query in a namespace with the same hits.
	pub fn by_namespace(responses: Vec<(&str, Vec<(&str, f64)>)>) -> Self {
		let responses: HashMap<String, Vec<ScoredConcept>> =
			responses.into_iter().map(|(namespace, hits)| (namespace.to_string(), hits_of(&hits))).collect();

		Self::new(move |query| responses.get(&query.namespace).cloned().unwrap_or_default())
	}

	/// Fails the next `times` calls to `namespace` with a transient error.
	pub fn fail_times(self, namespace: &str, times: u32) -> Self {
		lock(&self.failures).insert(namespace.to_string(), times);

		self
	}

	/// Fails every call to `namespace` with an error that retrying cannot fix.
	pub fn reject(self, namespace: &str) -> Self {
		lock(&self.rejections).insert(namespace.to_string());

		self
	}

	pub fn with_delay<F>(mut self, delay: F) -> Self
	where
		F: Fn(&RecordedQuery) -> Duration + Send + Sync + 'static,
	{
		self.delay = Some(Box::new(delay));

		self
	}

	pub fn calls(&self) -> Vec<RecordedQuery> {
		lock(&self.calls).clone()
	}

	/// Most searches that were awaiting a reply at the same time.
	pub fn peak_in_flight(&self) -> usize {
		self.peak_in_flight.load(Ordering::SeqCst)
	}
}
impl VectorIndex for ScriptedIndex {
	fn search<'a>(&'a self, query: IndexQuery<'a>) -> BoxFuture<'a, Result<Vec<ScoredConcept>>> {
		let recorded = RecordedQuery {
			namespace: query.namespace.to_string(),
			dense: query.dense.to_vec(),
			sparse: query.sparse.clone(),
			top_k: query.top_k,
		};

		lock(&self.calls).push(recorded.clone());

		let transient = {
			let mut failures = lock(&self.failures);

			match failures.get_mut(&recorded.namespace) {
				Some(remaining) if *remaining > 0 => {
					*remaining -= 1;

					true
				},
				_ => false,
			}
		};
		let result = if lock(&self.rejections).contains(&recorded.namespace) {
			Err(Error::Provider { message: format!("{} rejected the query.", recorded.namespace) })
		} else if transient {
			Err(Error::Unavailable { message: format!("{} is unavailable.", recorded.namespace) })
		} else {
			let mut hits = (self.responder)(&recorded);

			hits.truncate(recorded.top_k as usize);

			Ok(hits)
		};
		let delay = self.delay.as_ref().map(|delay| delay(&recorded));
		let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

		self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			result
		})
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}

pub fn hits_of(hits: &[(&str, f64)]) -> Vec<ScoredConcept> {
	hits.iter().map(|(id, score)| ScoredConcept { id: id.to_string(), score: *score }).collect()
}

pub fn catalog(entries: &[(&str, &str, &str)]) -> Arc<MetadataCatalog> {
	Arc::new(
		entries
			.iter()
			.map(|(id, title, cui)| {
				(id.to_string(), ConceptMetadata {
					title: Some(title.to_string()),
					cui: Some(cui.to_string()),
					..Default::default()
				})
			})
			.collect(),
	)
}

/// A variable with the same embedding pair under every given prefix. The sparse indices double
/// as an identity marker since alpha scaling leaves them untouched.
pub fn variable(name: &str, search_id: u32, prefixes: &[&str], marker: u32) -> Variable {
	let pair = EmbeddingPair {
		dense: vec![0.6, 0.8],
		sparse: SparseVector { indices: vec![marker], values: vec![1.0] },
	};

	Variable {
		variable_name: name.to_string(),
		search_id,
		title: name.to_string(),
		definition: String::new(),
		embeddings: prefixes.iter().map(|prefix| (prefix.to_string(), pair.clone())).collect(),
	}
}

pub fn spec(name: &str, namespace: &str) -> QuerySpec {
	QuerySpec {
		name: name.to_string(),
		embed_column_prefix: name.to_string(),
		namespace: namespace.to_string(),
	}
}

pub fn test_config(specs: Vec<QuerySpec>, top_k: u32) -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		index: Index {
			backend: IndexBackend::Pinecone,
			pinecone: Some(Pinecone {
				host: "http://localhost:5080".to_string(),
				path: "/query".to_string(),
				api_key: "test-key".to_string(),
				api_key_env: "PINECONE_API_KEY".to_string(),
				timeout_ms: 1_000,
				default_headers: BTreeMap::new(),
			}),
			qdrant: None,
		},
		query: Query { top_k, alpha: Alphas::One(0.5), include_metadata: true, specs },
		pipeline: Pipeline {
			name: "hybrid_semantic_search".to_string(),
			custom_config: "test".to_string(),
		},
		policy: Policy::default(),
		retry: Retry { max_attempts: 1, initial_backoff_ms: 1, max_backoff_ms: 1 },
		runtime: Runtime::default(),
	}
}
