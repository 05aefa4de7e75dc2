use cuimap_config::QuerySpec;

/// Ordered set of named retrieval channels. Declaration order is significant: it is the order
/// queries are issued and fused in.
#[derive(Debug, Clone)]
pub struct QueryRegistry {
	specs: Vec<QuerySpec>,
}
impl QueryRegistry {
	pub fn new(specs: Vec<QuerySpec>) -> Self {
		Self { specs }
	}

	pub fn from_config(cfg: &cuimap_config::Query) -> Self {
		Self::new(cfg.specs.clone())
	}

	pub fn specs(&self) -> &[QuerySpec] {
		&self.specs
	}

	pub fn names(&self) -> Vec<String> {
		self.specs.iter().map(|spec| spec.name.clone()).collect()
	}

	pub fn len(&self) -> usize {
		self.specs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.specs.is_empty()
	}
}
