//! Stage runner: applies the configured stages to every chunk, in order.
//!
//! Chunks run in index order and stages in configured order, one generation
//! call at a time. After each call the global tail in [`Memory`] is replaced,
//! so the next call (same chunk or the next one) sees the latest edit.

use scrivener_config::PipelineSettings;
use scrivener_core::{
    Chunk, EditedChunk, GenerationRequest, Memory, PipelineError, Provider, Result, StageConfig,
    StageLog,
};
use tracing::{debug, trace};

use crate::prompt::build_prompt;
use crate::response::ResponseShape;
use crate::tail::{tail_budget, tail_of};

pub struct StageRunner<'a> {
    provider: &'a dyn Provider,
    settings: &'a PipelineSettings,
}

impl<'a> StageRunner<'a> {
    pub fn new(provider: &'a dyn Provider, settings: &'a PipelineSettings) -> Self {
        Self { provider, settings }
    }

    /// Run every enabled stage over every chunk.
    ///
    /// A provider error aborts the run and is returned as is; `memory` keeps
    /// whatever tail was written before the failure.
    pub async fn run(
        &self,
        chunks: &[Chunk],
        memory: &mut Memory,
        log: &mut StageLog,
    ) -> Result<Vec<EditedChunk>> {
        if self.settings.stages.is_empty() {
            return Err(PipelineError::NoStages.into());
        }

        let mut edited = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let mut current = chunk.text.clone();

            for (i, stage) in self.settings.stages.iter().enumerate() {
                let ordinal = i + 1;
                if !stage.should_run() {
                    debug!(chunk = chunk.index, stage = %stage.name, "Stage disabled, skipping");
                    continue;
                }
                if let Some(condition) = &stage.condition {
                    // Conditions are carried but not evaluated.
                    debug!(stage = %stage.name, condition = condition.expression(), "Stage condition present");
                }

                current = self.invoke(stage, &current, memory).await?;

                if self.settings.verbose && stage.save_output {
                    log.record(ordinal, chunk.index, &current);
                }
            }

            edited.push(EditedChunk {
                index: chunk.index,
                text: current,
            });
        }

        Ok(edited)
    }

    /// One generation call: prompt, resolve, update the tail.
    async fn invoke(&self, stage: &StageConfig, text: &str, memory: &mut Memory) -> Result<String> {
        let request = GenerationRequest {
            model: stage.effective_model(&self.settings.default_model).to_string(),
            prompt: build_prompt(memory, stage, text),
            temperature: stage.effective_temperature(self.settings.default_temperature),
            max_tokens: stage.max_tokens,
            output_format: stage.output_format,
        };

        debug!(
            stage = %stage.name,
            model = %request.model,
            provider = self.provider.name(),
            input_chars = text.chars().count(),
            "Invoking stage"
        );

        let body = self.provider.generate(request).await?;
        let shape = ResponseShape::parse(&body);
        trace!(stage = %stage.name, shape = shape.kind(), "Response resolved");
        let output = shape.into_text();

        memory.set_tail(tail_of(&output, tail_budget(self.settings.overlap_chars)));
        Ok(output)
    }
}
