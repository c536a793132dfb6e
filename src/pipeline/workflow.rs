//! Sequential stage driver.
//!
//! The workflow manager runs the generation stages strictly in order, each
//! stage's prompt built from the stage template, the product description,
//! and verbatim JSON dumps of every prior stage result. A stage failure
//! aborts the run; there is no automatic retry and no partial-context
//! continuation (later stages' prompts assume earlier stages succeeded).

use std::sync::Arc;

use serde_json::Value;

use crate::config::PipelineConfig;
use crate::error::{GenerationError, GenerationResult};
use crate::llm::{Attachment, CompletionProvider, CompletionRequest};
use crate::pipeline::adapter::adapt_stage;
use crate::pipeline::context::{PipelineContext, PipelineState, Stage};
use crate::pipeline::product::ProductDescription;
use crate::pipeline::stages::MarketingAngle;
use crate::prompts::TemplateStore;
use crate::utils::extract_json;

/// Drives pipeline runs against a completion provider and a template store.
///
/// The manager itself holds no per-run state; concurrent runs are fully
/// independent and share only the read-only template store.
pub struct WorkflowManager {
    provider: Arc<dyn CompletionProvider>,
    templates: Arc<TemplateStore>,
    config: PipelineConfig,
}

impl WorkflowManager {
    /// Creates a new workflow manager.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        templates: Arc<TemplateStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            templates,
            config,
        }
    }

    /// Runs the analysis stages (avatar → journey → objections → angles)
    /// for a fresh campaign.
    ///
    /// `attachments` are product brief documents (PDF/image) forwarded on
    /// every analysis call; prompts carry full context rather than
    /// summaries, and the same holds for source documents.
    pub async fn run_analysis(
        &self,
        campaign_id: impl Into<String>,
        product: ProductDescription,
        attachments: Vec<Attachment>,
    ) -> GenerationResult<PipelineContext> {
        let mut ctx = PipelineContext::new(campaign_id, product);

        for stage in Stage::ANALYSIS {
            self.run_stage(&mut ctx, stage, None, &attachments).await?;
        }

        ctx.set_state(PipelineState::Completed);
        Ok(ctx)
    }

    /// Runs the hooks → scripts continuation for previously selected
    /// angles.
    ///
    /// The context must hold a completed angles result; it may be freshly
    /// generated or reconstructed from storage. Selected angle ids are
    /// resolved against that result.
    pub async fn run_continuation(
        &self,
        ctx: &mut PipelineContext,
        selected_angle_ids: &[String],
    ) -> GenerationResult<()> {
        let selected = self.select_angles(ctx, selected_angle_ids)?;
        let selection_section = render_selected_angles(&selected);

        for stage in Stage::CONTINUATION {
            self.run_stage(ctx, stage, Some(&selection_section), &[])
                .await?;
        }

        ctx.set_state(PipelineState::Completed);
        Ok(())
    }

    /// Resolves selected angle ids against the context's angles result.
    fn select_angles(
        &self,
        ctx: &PipelineContext,
        selected_angle_ids: &[String],
    ) -> GenerationResult<Vec<MarketingAngle>> {
        let angles = ctx
            .get(Stage::Angles)
            .and_then(|r| r.as_angles())
            .ok_or(GenerationError::ContinuationMissingStage {
                missing: Stage::Angles,
            })?;

        selected_angle_ids
            .iter()
            .map(|id| {
                angles
                    .find(id)
                    .cloned()
                    .ok_or_else(|| GenerationError::UnknownAngle {
                        angle_id: id.clone(),
                    })
            })
            .collect()
    }

    /// Runs one stage transition: build prompt, call the provider,
    /// normalize, parse, type, validate, append.
    async fn run_stage(
        &self,
        ctx: &mut PipelineContext,
        stage: Stage,
        extra_section: Option<&str>,
        attachments: &[Attachment],
    ) -> GenerationResult<()> {
        ctx.set_state(PipelineState::InProgress(stage));

        let result = self
            .generate_stage(ctx, stage, extra_section, attachments)
            .await;

        match result {
            Ok(stage_result) => {
                if let Err(err) = ctx.record(stage_result) {
                    ctx.set_state(PipelineState::Failed);
                    return Err(err);
                }
                tracing::info!(stage = %stage, campaign = ctx.campaign_id(), "stage completed");
                Ok(())
            }
            Err(err) => {
                ctx.set_state(PipelineState::Failed);
                Err(err)
            }
        }
    }

    async fn generate_stage(
        &self,
        ctx: &PipelineContext,
        stage: Stage,
        extra_section: Option<&str>,
        attachments: &[Attachment],
    ) -> GenerationResult<crate::pipeline::stages::StageResult> {
        let template = self.templates.get(stage.key());
        let user_prompt = self.build_user_prompt(ctx, stage, extra_section);
        let system_prompt = template.role.clone().unwrap_or_default();

        tracing::debug!(
            stage = %stage,
            prompt_chars = user_prompt.len(),
            attachments = attachments.len(),
            "running stage"
        );

        let request = CompletionRequest::new(system_prompt, user_prompt, self.config.max_output_tokens)
            .with_attachments(attachments.to_vec());

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|source| GenerationError::Completion { stage, source })?;

        if response.truncated {
            // A truncated response will fail JSON parsing below; the signal
            // must reach the logs rather than vanish into the parse error.
            tracing::warn!(
                stage = %stage,
                output_tokens = response.usage.output_tokens,
                "completion truncated by output token ceiling"
            );
        }

        let cleaned = extract_json(&response.text);
        let parsed: Value = serde_json::from_str(&cleaned).map_err(|e| {
            GenerationError::malformed(stage, format!("invalid JSON: {}", e), &response.text)
        })?;

        let payload = unwrap_payload_key(parsed, stage.payload_key());
        adapt_stage(stage, payload, &response.text)
    }

    /// Builds the user prompt for a stage: instructions, the product
    /// rendering, verbatim JSON dumps of all prior stage results, any
    /// extra section, and the expected output format.
    fn build_user_prompt(
        &self,
        ctx: &PipelineContext,
        stage: Stage,
        extra_section: Option<&str>,
    ) -> String {
        let template = self.templates.get(stage.key());
        let mut prompt = String::new();

        if let Some(instructions) = &template.instructions {
            prompt.push_str(instructions);
            prompt.push_str("\n\n");
        }

        prompt.push_str("## Product\n");
        prompt.push_str(&ctx.product().render_for_prompt());
        prompt.push('\n');

        let prior = ctx.render_for_prompt();
        if !prior.is_empty() {
            prompt.push_str("## Prior analysis\n");
            prompt.push_str(&prior);
        }

        if let Some(extra) = extra_section {
            prompt.push_str(extra);
            prompt.push('\n');
        }

        if let Some(format) = template.output_format.as_ref().and_then(|f| f.render()) {
            prompt.push_str("## Output format\n");
            prompt.push_str(&format);
            prompt.push('\n');
        }

        prompt
    }
}

/// Unwraps the stage-specific top-level key when the model wrapped its
/// answer; an unwrapped object is taken as the payload itself.
fn unwrap_payload_key(value: Value, key: &str) -> Value {
    match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

/// Renders the user-selected angles as a labeled JSON section.
fn render_selected_angles(selected: &[MarketingAngle]) -> String {
    let json = serde_json::to_string_pretty(selected).unwrap_or_else(|_| "[]".to_string());
    format!("## Selected angles\n{}\n", json)
}
