//! Multi-stage generation pipeline.
//!
//! The pipeline runs an ordered sequence of generation stages, each stage
//! consuming the accumulated output of all prior stages plus the original
//! product description, producing a strongly-typed result that is appended
//! to the shared [`PipelineContext`] for subsequent stages.
//!
//! Stages execute strictly sequentially within a run; distinct runs are
//! fully independent (no shared mutable state beyond the read-only
//! template store).

pub mod adapter;
pub mod context;
pub mod product;
pub mod stages;
pub mod workflow;

pub use context::{PipelineContext, PipelineState, Stage};
pub use product::ProductDescription;
pub use stages::{
    AnglePolarity, AnglesGeneration, AvatarAnalysis, CustomerJourney, Hook, HooksByAngle,
    JourneyStage, MarketingAngle, Objection, ObjectionsAnalysis, ScriptBatch, ScriptRecord,
    StageResult,
};
pub use workflow::WorkflowManager;
