mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Alphas, Config, EmptyResultPolicy, Index, IndexBackend, MetadataMissPolicy, Pinecone, Pipeline,
	Policy, Qdrant, Query, QuerySpec, RetrievalFailurePolicy, Retry, Runtime, Service, TieBreak,
};

use std::{collections::HashSet, env, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::Parse { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	match cfg.index.backend {
		IndexBackend::Pinecone => {
			let Some(pinecone) = cfg.index.pinecone.as_ref() else {
				return Err(Error::Validation {
					message: "index.pinecone must be set when index.backend is pinecone."
						.to_string(),
				});
			};

			if pinecone.host.trim().is_empty() {
				return Err(Error::Validation {
					message: "index.pinecone.host must be non-empty.".to_string(),
				});
			}
			if pinecone.api_key.trim().is_empty() {
				return Err(Error::MissingCredential { env_var: pinecone.api_key_env.clone() });
			}
			if pinecone.timeout_ms == 0 {
				return Err(Error::Validation {
					message: "index.pinecone.timeout_ms must be greater than zero.".to_string(),
				});
			}
		},
		IndexBackend::Qdrant => {
			let Some(qdrant) = cfg.index.qdrant.as_ref() else {
				return Err(Error::Validation {
					message: "index.qdrant must be set when index.backend is qdrant.".to_string(),
				});
			};

			for (label, value) in [
				("index.qdrant.url", &qdrant.url),
				("index.qdrant.collection", &qdrant.collection),
				("index.qdrant.dense_vector", &qdrant.dense_vector),
				("index.qdrant.sparse_vector", &qdrant.sparse_vector),
				("index.qdrant.namespace_field", &qdrant.namespace_field),
			] {
				if value.trim().is_empty() {
					return Err(Error::Validation { message: format!("{label} must be non-empty.") });
				}
			}

			if qdrant.candidate_pool_factor == 0 {
				return Err(Error::Validation {
					message: "index.qdrant.candidate_pool_factor must be greater than zero."
						.to_string(),
				});
			}
		},
	}

	if cfg.query.top_k == 0 {
		return Err(Error::Validation {
			message: "query.top_k must be greater than zero.".to_string(),
		});
	}

	let alphas = cfg.query.alpha.to_vec();

	if alphas.is_empty() {
		return Err(Error::Validation { message: "query.alpha must be non-empty.".to_string() });
	}

	for alpha in alphas {
		if !alpha.is_finite() {
			return Err(Error::Validation {
				message: "query.alpha values must be finite numbers.".to_string(),
			});
		}
		if !(0.0..=1.0).contains(&alpha) {
			return Err(Error::Validation {
				message: "query.alpha values must be in the range 0.0-1.0.".to_string(),
			});
		}
	}

	if cfg.query.specs.is_empty() {
		return Err(Error::Validation {
			message: "query.specs must declare at least one query.".to_string(),
		});
	}

	let mut names = HashSet::new();

	for spec in &cfg.query.specs {
		for (label, value) in [
			("query.specs.name", &spec.name),
			("query.specs.embed_column_prefix", &spec.embed_column_prefix),
			("query.specs.namespace", &spec.namespace),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if !names.insert(spec.name.as_str()) {
			return Err(Error::Validation {
				message: format!("query.specs.name {} is declared more than once.", spec.name),
			});
		}
	}

	if cfg.pipeline.name.trim().is_empty() {
		return Err(Error::Validation {
			message: "pipeline.name must be non-empty.".to_string(),
		});
	}
	if cfg.retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.initial_backoff_ms > cfg.retry.max_backoff_ms {
		return Err(Error::Validation {
			message: "retry.initial_backoff_ms must not exceed retry.max_backoff_ms.".to_string(),
		});
	}
	if cfg.runtime.concurrency == 0 {
		return Err(Error::Validation {
			message: "runtime.concurrency must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.query.alpha = Alphas::Many(cfg.query.alpha.to_vec());

	if let Some(pinecone) = cfg.index.pinecone.as_mut() {
		pinecone.host = pinecone.host.trim_end_matches('/').to_string();

		if pinecone.api_key.trim().is_empty()
			&& let Ok(key) = env::var(&pinecone.api_key_env)
		{
			pinecone.api_key = key;
		}
	}
}
