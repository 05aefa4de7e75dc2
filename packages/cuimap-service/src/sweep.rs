use futures::{StreamExt, stream};

use cuimap_config::{Alphas, EmptyResultPolicy, RetrievalFailurePolicy};
use cuimap_storage::models::Variable;

use crate::{
	Error, MappingService, Result,
	fusion::{self, FusionPolicy},
	retrieval::RetrievalRunner,
	scale,
	table::{CandidateRow, CandidateTable},
};

/// Tag attached to every row produced by the pass at `alpha`.
pub fn pipeline_label(pipeline: &cuimap_config::Pipeline, alpha: f32) -> String {
	format!("{} (custom={}, alpha={alpha})", pipeline.name, pipeline.custom_config)
}

impl MappingService {
	/// Runs one full pass per alpha and concatenates the passes in the given order.
	///
	/// Passes share nothing but the inputs; each row carries its pass label.
	pub async fn sweep(&self, variables: &[Variable], alphas: &Alphas) -> Result<CandidateTable> {
		let alphas = alphas.to_vec();

		if alphas.is_empty() {
			return Err(Error::InvalidParameter {
				message: "At least one alpha is required.".to_string(),
			});
		}

		for alpha in &alphas {
			scale::validate_alpha(*alpha)?;
		}

		let mut table = CandidateTable::new(self.registry.names());

		for alpha in alphas {
			let rows = self.run_pass(variables, alpha).await?;

			table.rows.extend(rows);
		}

		tracing::info!(rows = table.len(), passes = table.labels().len(), "Alpha sweep finished.");

		Ok(table)
	}

	/// Retrieves and fuses candidates for every variable at a fixed alpha.
	///
	/// Output follows variable input order even when several variables are in flight.
	pub async fn run_pass(&self, variables: &[Variable], alpha: f32) -> Result<Vec<CandidateRow>> {
		scale::validate_alpha(alpha)?;

		let label = pipeline_label(&self.cfg.pipeline, alpha);
		let concurrency = self.cfg.runtime.concurrency.max(1) as usize;
		let label_ref = label.as_str();
		let mut pending = stream::iter(variables)
			.map(|variable| async move {
				(variable, self.map_variable(variable, alpha, label_ref).await)
			})
			.buffered(concurrency);
		let mut rows = Vec::new();
		let mut skipped = 0_usize;

		while let Some((variable, result)) = pending.next().await {
			match result {
				Ok(variable_rows) => rows.extend(variable_rows),
				Err(err @ Error::RetrievalFailure { .. })
					if self.cfg.policy.on_retrieval_failure
						== RetrievalFailurePolicy::SkipVariable =>
				{
					tracing::warn!(
						variable = %variable.variable_name,
						alpha,
						error = %err,
						"Skipping variable after retrieval failure."
					);

					skipped += 1;
				},
				Err(err) => return Err(err),
			}
		}

		tracing::info!(
			alpha,
			label = %label,
			variables = variables.len(),
			skipped,
			rows = rows.len(),
			"Alpha pass finished."
		);

		Ok(rows)
	}

	async fn map_variable(
		&self,
		variable: &Variable,
		alpha: f32,
		label: &str,
	) -> Result<Vec<CandidateRow>> {
		let runner = RetrievalRunner {
			index: self.index.as_ref(),
			registry: &self.registry,
			top_k: self.cfg.query.top_k,
			include_metadata: self.cfg.query.include_metadata,
			retry: self.cfg.retry,
		};
		let results = runner.run(variable, alpha).await?;
		let candidates = fusion::aggregate(
			&results,
			self.metadata.as_ref(),
			FusionPolicy::from(&self.cfg.policy),
		)?;

		if candidates.is_empty() {
			match self.cfg.policy.on_empty_result {
				EmptyResultPolicy::Drop => {},
				EmptyResultPolicy::LogAndDrop => {
					tracing::warn!(
						variable = %variable.variable_name,
						alpha,
						"Variable produced no matches and is left out of the output."
					);
				},
				EmptyResultPolicy::Fail => {
					return Err(Error::EmptyResultSet { variable: variable.variable_name.clone() });
				},
			}
		}

		Ok(candidates
			.into_iter()
			.map(|candidate| CandidateRow {
				variable_name: variable.variable_name.clone(),
				search_id: variable.search_id,
				pipeline_label: label.to_string(),
				alpha,
				rec_count: self.cfg.query.top_k,
				candidate,
			})
			.collect())
	}
}
