pub mod fusion;
pub mod registry;
pub mod retrieval;
pub mod scale;
pub mod sweep;
pub mod table;

mod error;

pub use error::{Error, Result};
pub use fusion::{BLANK_PLACEHOLDER, Candidate, FusionPolicy, QueryHit, ResolvedMetadata};
pub use registry::QueryRegistry;
pub use retrieval::{Match, QueryMatches, RetrievalRunner};
pub use sweep::pipeline_label;
pub use table::{CandidateRow, CandidateTable};

use std::{future::Future, pin::Pin, sync::Arc};

use cuimap_config::{Config, IndexBackend};
use cuimap_providers::pinecone::{HybridQuery, PineconeIndex};
use cuimap_storage::{
	metadata::MetadataCatalog,
	models::{ConceptMetadata, ScoredConcept, SparseVector},
	qdrant::QdrantStore,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A hybrid similarity request against one namespace. Vectors are already scaled.
#[derive(Debug, Clone, Copy)]
pub struct IndexQuery<'a> {
	pub namespace: &'a str,
	pub dense: &'a [f32],
	pub sparse: &'a SparseVector,
	pub top_k: u32,
	pub include_metadata: bool,
}

/// Vector-index query service. Results come back best first, at most `top_k` of them.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, query: IndexQuery<'a>) -> BoxFuture<'a, Result<Vec<ScoredConcept>>>;
}

pub trait MetadataStore
where
	Self: Send + Sync,
{
	fn lookup(&self, concept_id: &str) -> Option<ConceptMetadata>;
}

pub struct MappingService {
	pub cfg: Config,
	pub registry: QueryRegistry,
	pub index: Arc<dyn VectorIndex>,
	pub metadata: Arc<dyn MetadataStore>,
}
impl MappingService {
	pub fn new(cfg: Config, index: Arc<dyn VectorIndex>, metadata: Arc<dyn MetadataStore>) -> Self {
		let registry = QueryRegistry::from_config(&cfg.query);

		Self { cfg, registry, index, metadata }
	}
}

impl VectorIndex for PineconeIndex {
	fn search<'a>(&'a self, query: IndexQuery<'a>) -> BoxFuture<'a, Result<Vec<ScoredConcept>>> {
		Box::pin(async move {
			let matches = self
				.query(HybridQuery {
					namespace: query.namespace,
					dense: query.dense,
					sparse_indices: &query.sparse.indices,
					sparse_values: &query.sparse.values,
					top_k: query.top_k,
					include_metadata: query.include_metadata,
				})
				.await?;

			Ok(matches.into_iter().map(|m| ScoredConcept { id: m.id, score: m.score }).collect())
		})
	}
}

impl VectorIndex for QdrantStore {
	fn search<'a>(&'a self, query: IndexQuery<'a>) -> BoxFuture<'a, Result<Vec<ScoredConcept>>> {
		Box::pin(async move {
			Ok(self.query_hybrid(query.namespace, query.dense, query.sparse, query.top_k).await?)
		})
	}
}

impl MetadataStore for MetadataCatalog {
	fn lookup(&self, concept_id: &str) -> Option<ConceptMetadata> {
		self.get(concept_id).cloned()
	}
}

/// Builds the index client selected by `index.backend`.
pub fn index_from_config(cfg: &Config) -> Result<Arc<dyn VectorIndex>> {
	match cfg.index.backend {
		IndexBackend::Pinecone => {
			let pinecone = cfg.index.pinecone.as_ref().ok_or_else(|| Error::InvalidParameter {
				message: "index.pinecone is not configured.".to_string(),
			})?;

			Ok(Arc::new(PineconeIndex::new(pinecone)?))
		},
		IndexBackend::Qdrant => {
			let qdrant = cfg.index.qdrant.as_ref().ok_or_else(|| Error::InvalidParameter {
				message: "index.qdrant is not configured.".to_string(),
			})?;

			Ok(Arc::new(QdrantStore::new(qdrant)?))
		},
	}
}
