//! Pipeline stages, run state, and the append-only context.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GenerationError, GenerationResult};
use crate::pipeline::product::ProductDescription;
use crate::pipeline::stages::StageResult;

/// One phase of the generation pipeline.
///
/// The analysis run covers Avatar through Angles; Hooks and Scripts form a
/// separate continuation keyed by user-selected angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Customer avatar analysis.
    Avatar,
    /// Customer journey mapping.
    Journey,
    /// Purchase objections analysis.
    Objections,
    /// Marketing angle generation.
    Angles,
    /// Hook generation for selected angles.
    Hooks,
    /// Script generation.
    Scripts,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::Avatar,
        Stage::Journey,
        Stage::Objections,
        Stage::Angles,
        Stage::Hooks,
        Stage::Scripts,
    ];

    /// Stages of the initial analysis run, in order.
    pub const ANALYSIS: [Stage; 4] = [
        Stage::Avatar,
        Stage::Journey,
        Stage::Objections,
        Stage::Angles,
    ];

    /// Stages of the hooks/scripts continuation, in order.
    pub const CONTINUATION: [Stage; 2] = [Stage::Hooks, Stage::Scripts];

    /// Stable key used for template lookup, context keys, and persistence.
    pub fn key(&self) -> &'static str {
        match self {
            Stage::Avatar => "avatar",
            Stage::Journey => "journey",
            Stage::Objections => "objections",
            Stage::Angles => "angles",
            Stage::Hooks => "hooks",
            Stage::Scripts => "scripts",
        }
    }

    /// Top-level key the model may wrap this stage's payload in.
    ///
    /// Responses arrive both wrapped (`{"avatar_analysis": {...}}`) and
    /// unwrapped; both shapes are accepted.
    pub fn payload_key(&self) -> &'static str {
        match self {
            Stage::Avatar => "avatar_analysis",
            Stage::Journey => "customer_journey",
            Stage::Objections => "objections_analysis",
            Stage::Angles => "angles",
            Stage::Hooks => "hooks",
            Stage::Scripts => "scripts",
        }
    }

    /// Parses a stage from its stable key.
    pub fn from_key(key: &str) -> Option<Stage> {
        Stage::ALL.iter().copied().find(|s| s.key() == key)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Avatar => write!(f, "Avatar"),
            Stage::Journey => write!(f, "Journey"),
            Stage::Objections => write!(f, "Objections"),
            Stage::Angles => write!(f, "Angles"),
            Stage::Hooks => write!(f, "Hooks"),
            Stage::Scripts => write!(f, "Scripts"),
        }
    }
}

/// Lifecycle state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    /// No stage has started.
    NotStarted,
    /// The named stage is currently generating.
    InProgress(Stage),
    /// All requested stages completed.
    Completed,
    /// A stage failed; the run is abandoned.
    Failed,
}

/// The accumulated, append-only set of stage results for one pipeline run.
///
/// Owned exclusively by one run: stage N's prompt construction may read any
/// result recorded before it, and previously stored results are never
/// mutated. The context is a per-run value; persisted rows keyed by
/// campaign are the durable source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    run_id: Uuid,
    campaign_id: String,
    product: ProductDescription,
    state: PipelineState,
    /// Results in the order they were recorded.
    results: Vec<StageResult>,
}

impl PipelineContext {
    /// Creates an empty context for a fresh run.
    pub fn new(campaign_id: impl Into<String>, product: ProductDescription) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            campaign_id: campaign_id.into(),
            product,
            state: PipelineState::NotStarted,
            results: Vec::new(),
        }
    }

    /// Reconstructs a context from previously persisted results.
    ///
    /// The reconstructed context belongs to a fresh run (new run id); the
    /// campaign id is the durable key. Results must be supplied in
    /// canonical stage order.
    pub fn resume(
        campaign_id: impl Into<String>,
        product: ProductDescription,
        results: Vec<StageResult>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            campaign_id: campaign_id.into(),
            product,
            state: PipelineState::NotStarted,
            results,
        }
    }

    /// Unique id of this run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Campaign this run belongs to.
    pub fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    /// The immutable product description driving this run.
    pub fn product(&self) -> &ProductDescription {
        &self.product
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: PipelineState) {
        self.state = state;
    }

    /// Records a stage result. Append-only: recording a second result for
    /// the same stage is an error.
    pub fn record(&mut self, result: StageResult) -> GenerationResult<()> {
        let stage = result.stage();
        if self.contains(stage) {
            return Err(GenerationError::StageAlreadyRecorded { stage });
        }
        self.results.push(result);
        Ok(())
    }

    /// Returns the result for a stage, when recorded.
    pub fn get(&self, stage: Stage) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage() == stage)
    }

    /// Returns true when a result for the stage is recorded.
    pub fn contains(&self, stage: Stage) -> bool {
        self.get(stage).is_some()
    }

    /// Stages with recorded results, in recording order.
    pub fn completed_stages(&self) -> Vec<Stage> {
        self.results.iter().map(|r| r.stage()).collect()
    }

    /// All recorded results in recording order.
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// Renders every recorded result as a labeled verbatim JSON section for
    /// prompt construction.
    ///
    /// Full fidelity over token economy: prior results are dumped as-is,
    /// never summarized.
    pub fn render_for_prompt(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            out.push_str(&format!("### {} result\n", result.stage()));
            match serde_json::to_string_pretty(&result.payload_json()) {
                Ok(json) => out.push_str(&json),
                Err(_) => out.push_str("{}"),
            }
            out.push_str("\n\n");
        }
        out
    }
}
