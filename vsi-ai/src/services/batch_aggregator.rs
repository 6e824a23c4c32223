//! Batch aggregation
//!
//! Drives a full analysis run: chunk the batch, then for each chunk in order
//! run both passes, fuse, classify, and append to the run result. Chunks are
//! processed sequentially; the only suspension points are the inference calls.
//!
//! Any chunk's inference failure (after retries) fails the whole run with no
//! partial output.

use std::collections::HashSet;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::AnalysisError;
use crate::models::{ImageAssessment, ImageRef, RunResult};
use crate::services::chunker;
use crate::services::consensus_fusion;
use crate::services::dual_pass_assessor::DualPassAssessor;
use crate::services::rule_engine;

pub struct BatchAggregator {
    assessor: DualPassAssessor,
    chunk_size: usize,
}

impl BatchAggregator {
    pub fn new(assessor: DualPassAssessor, chunk_size: usize) -> Self {
        Self {
            assessor,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Analyze `images` and return the merged result
    ///
    /// # Errors
    /// - `InvalidArgument` for an empty batch, a repeated image id or zero
    ///   chunk size (no inference call is made)
    /// - `Inference` for the first chunk whose inference fails
    pub async fn run(&self, images: &[ImageRef]) -> Result<RunResult, AnalysisError> {
        if images.is_empty() {
            return Err(AnalysisError::InvalidArgument(
                "batch contains no images".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(images.len());
        if let Some(duplicate) = images.iter().find(|image| !seen.insert(image.id.as_str())) {
            return Err(AnalysisError::InvalidArgument(format!(
                "duplicate image id in batch: {}",
                duplicate.id
            )));
        }
        let chunks = chunker::chunk(images, self.chunk_size)?;

        let run_id = Uuid::new_v4();
        let span = info_span!("analysis_run", %run_id);

        async move {
            info!(
                image_count = images.len(),
                chunk_count = chunks.len(),
                chunk_size = self.chunk_size,
                "Starting analysis run"
            );

            let mut result = RunResult::default();

            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                let assessments = self.process_chunk(chunk_index, chunk, &mut result.unassessed).await?;
                for assessment in assessments {
                    result.summary.record(assessment.condition);
                    result.assessments.push(assessment);
                }
            }

            info!(
                fire_hazard = result.summary.fire_hazard_count,
                trip_fall = result.summary.trip_fall_count,
                none = result.summary.none_count,
                unassessed = result.unassessed.len(),
                "Analysis run complete"
            );

            Ok(result)
        }
        .instrument(span)
        .await
    }

    async fn process_chunk(
        &self,
        chunk_index: usize,
        chunk: &[ImageRef],
        unassessed: &mut Vec<String>,
    ) -> Result<Vec<ImageAssessment>, AnalysisError> {
        let mut passes = self
            .assessor
            .assess(chunk)
            .await
            .map_err(|source| AnalysisError::Inference {
                chunk_index,
                source,
            })?;

        let matched = consensus_fusion::fuse_records(&mut passes.descriptive, &passes.checker);

        let assessments: Vec<ImageAssessment> = passes
            .descriptive
            .into_iter()
            .map(|record| {
                let mut assessment = record.assessment;
                rule_engine::apply(&mut assessment);
                assessment
            })
            .collect();

        if !passes.missing.is_empty() {
            tracing::warn!(
                chunk_index,
                missing = ?passes.missing,
                "Descriptive pass returned no record for some images"
            );
        }
        unassessed.extend(passes.missing);

        info!(
            chunk_index,
            image_count = chunk.len(),
            assessed = assessments.len(),
            checker_matched = matched,
            "Chunk processed"
        );

        Ok(assessments)
    }
}
