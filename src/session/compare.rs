//! Comparison orchestrator
//!
//! Runs one prompt against several models at once. Each branch records its
//! own execution as soon as it finishes; the comparison itself is recorded
//! only once every branch has succeeded.

use crate::error::{PromptbenchError, Result};
use crate::models::{new_id, Comparison, Execution, SamplingParams};
use crate::session::SessionStore;
use crate::telemetry;

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Minimum number of models a comparison needs
pub const MIN_COMPARISON_MODELS: usize = 2;

impl SessionStore {
    /// Evaluate one prompt against several models concurrently
    ///
    /// `comparison.executions[i]` is always the result for `models[i]`, no
    /// matter which branch finished first.
    ///
    /// # Arguments
    ///
    /// * `prompt` - Prompt shared by every branch
    /// * `models` - Model identifiers, at least two
    /// * `params` - Sampling parameters shared by every branch
    ///
    /// # Errors
    ///
    /// Returns `PromptbenchError::InvalidRequest` for fewer than two models.
    /// Returns the first branch error as soon as it arrives; branches that
    /// are still running keep going and record their executions, but no
    /// comparison is recorded.
    pub async fn compare_models(
        self: &Arc<Self>,
        prompt: &str,
        models: &[String],
        params: SamplingParams,
    ) -> Result<Comparison> {
        if models.len() < MIN_COMPARISON_MODELS {
            return Err(PromptbenchError::InvalidRequest(format!(
                "A comparison needs at least {} models, got {}",
                MIN_COMPARISON_MODELS,
                models.len()
            ))
            .into());
        }

        let model_count = models.len();
        let start = Instant::now();
        tracing::info!(
            compare.event = "start",
            compare.model_count = model_count,
            compare.models = ?models,
            "Starting comparison"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Result<Execution>)>();
        for (index, model) in models.iter().enumerate() {
            let store = Arc::clone(self);
            let tx = tx.clone();
            let prompt = prompt.to_string();
            let model = model.clone();
            tokio::spawn(async move {
                let result = store.execute_prompt(&prompt, &model, params).await;
                // the collector may already have given up after a failure
                let _ = tx.send((index, result));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<Execution>> = vec![None; model_count];
        let mut completed = 0;

        while completed < model_count {
            let Some((index, result)) = rx.recv().await else {
                // a branch task ended without reporting
                telemetry::record_comparison("failed", model_count);
                return Err(PromptbenchError::Provider(
                    "Comparison branch terminated unexpectedly".to_string(),
                )
                .into());
            };

            match result {
                Ok(execution) => {
                    tracing::debug!(
                        compare.event = "branch_complete",
                        compare.index = index,
                        compare.model = %execution.model,
                        compare.latency_ms = execution.latency_ms,
                        "Comparison branch finished"
                    );
                    slots[index] = Some(execution);
                    completed += 1;
                }
                Err(e) => {
                    tracing::error!(
                        compare.event = "branch_failed",
                        compare.index = index,
                        compare.model = %models[index],
                        compare.error = %e,
                        "Comparison aborted"
                    );
                    telemetry::record_comparison("failed", model_count);
                    return Err(e);
                }
            }
        }

        let executions: Vec<Execution> = slots.into_iter().flatten().collect();
        let comparison = Comparison {
            id: new_id(),
            prompt: prompt.to_string(),
            executions,
            created_at: Utc::now(),
        };
        self.record_async(comparison.clone()).await;

        telemetry::record_comparison("complete", model_count);
        tracing::info!(
            compare.event = "complete",
            compare.id = %comparison.id,
            compare.model_count = model_count,
            compare.duration_ms = start.elapsed().as_millis() as u64,
            "Comparison complete"
        );

        Ok(comparison)
    }
}
