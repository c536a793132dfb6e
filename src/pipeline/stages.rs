//! Typed stage results.
//!
//! One record type per generation stage. Shapes are stage-specific but the
//! lifecycle is uniform: parsed from normalized LLM JSON, alternate key
//! spellings canonicalized (see [`crate::pipeline::adapter`]), required
//! fields validated, missing optional fields logged, then appended to the
//! run's [`crate::pipeline::PipelineContext`]. Once recorded, results are
//! immutable value objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::context::Stage;

/// Customer avatar analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarAnalysis {
    /// Short name for the avatar. Optional.
    #[serde(default)]
    pub avatar_name: String,
    /// Demographic profile. Optional, free-shaped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demographics: Option<Value>,
    /// Psychographic profile. Optional, free-shaped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psychographics: Option<Value>,
    /// Pain points. Required non-empty.
    pub pain_points: Vec<String>,
    /// Desires. Optional.
    #[serde(default)]
    pub desires: Vec<String>,
    /// Buying triggers. Optional.
    #[serde(default)]
    pub buying_triggers: Vec<String>,
}

/// One step of the customer journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyStage {
    /// Step name. Required.
    pub name: String,
    /// What happens at this step. Optional.
    #[serde(default)]
    pub description: String,
    /// Customer's emotional state at this step. Optional.
    #[serde(default)]
    pub emotional_state: String,
    /// Touchpoints where the customer meets the product. Optional.
    #[serde(default)]
    pub touchpoints: Vec<String>,
}

/// Customer journey mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerJourney {
    /// One-paragraph summary. Optional.
    #[serde(default)]
    pub summary: String,
    /// Ordered journey steps. Required non-empty.
    pub stages: Vec<JourneyStage>,
}

/// A purchase objection with its rebuttal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objection {
    /// The objection itself. Required.
    pub text: String,
    /// Suggested rebuttal. Optional.
    #[serde(default)]
    pub rebuttal: String,
    /// Severity tag. Optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

/// Purchase objections analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectionsAnalysis {
    /// Objections, strongest first. Required non-empty.
    pub objections: Vec<Objection>,
}

/// Polarity of a marketing angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnglePolarity {
    /// Supportive positioning.
    Positive,
    /// Counter-positioning.
    Negative,
}

impl std::fmt::Display for AnglePolarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnglePolarity::Positive => write!(f, "positive"),
            AnglePolarity::Negative => write!(f, "negative"),
        }
    }
}

/// One marketing positioning strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketingAngle {
    /// Stable composite identity, `angle_<n>`.
    pub angle_id: String,
    /// Ordinal parsed from or assigned alongside the id.
    pub angle_number: u32,
    /// Rhetorical technique tag.
    #[serde(default)]
    pub category: String,
    /// Free-text concept. Required.
    pub concept: String,
    /// Supportive or counter-positioning.
    pub polarity: AnglePolarity,
}

/// Marketing angle generation output: supportive and counter-positioning
/// buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnglesGeneration {
    /// Supportive angles.
    pub supportive: Vec<MarketingAngle>,
    /// Counter-positioning angles.
    pub counter: Vec<MarketingAngle>,
}

impl AnglesGeneration {
    /// All angles across both buckets, supportive first.
    pub fn all(&self) -> impl Iterator<Item = &MarketingAngle> {
        self.supportive.iter().chain(self.counter.iter())
    }

    /// Looks up an angle by id across both buckets.
    pub fn find(&self, angle_id: &str) -> Option<&MarketingAngle> {
        self.all().find(|a| a.angle_id == angle_id)
    }
}

/// A short attention-grabbing opening line for a specific angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    /// Identity `angle_<n>_<m>`.
    pub hook_id: String,
    /// Hook text. Required.
    pub text: String,
    /// Category tag, from the entry or its enclosing key.
    #[serde(default)]
    pub category: String,
}

/// Hook generation output, flattened across angles and categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HooksByAngle {
    /// Hooks in encounter order. Required non-empty.
    pub hooks: Vec<Hook>,
}

impl HooksByAngle {
    /// Hooks belonging to one angle, in encounter order.
    pub fn for_angle<'a>(&'a self, angle_id: &'a str) -> impl Iterator<Item = &'a Hook> {
        // hook ids extend angle ids: angle_1 owns angle_1_3 but not angle_12_3
        self.hooks
            .iter()
            .filter(move |h| h.hook_id.starts_with(angle_id) && {
                let rest = &h.hook_id[angle_id.len()..];
                rest.starts_with('_')
            })
    }
}

/// The atomic unit returned by the scripts stage, in flat form.
///
/// The underscore-delimited identity string (`angle_<n>_<m>_<k>`) is the
/// sole encoding of the angle/hook/script hierarchy; no parent pointer is
/// carried on the flat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    /// Identity `angle_<n>_<m>_<k>`.
    pub script_id: String,
    /// Script body. Required.
    pub content: String,
    /// Call to action. Optional.
    #[serde(default)]
    pub cta: String,
    /// Target emotion tag. Optional.
    #[serde(default)]
    pub target_emotion: String,
}

/// Script generation output in flat form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptBatch {
    /// Flat script records in generation order. Required non-empty.
    pub scripts: Vec<ScriptRecord>,
}

/// A completed stage result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "data", rename_all = "snake_case")]
pub enum StageResult {
    Avatar(AvatarAnalysis),
    Journey(CustomerJourney),
    Objections(ObjectionsAnalysis),
    Angles(AnglesGeneration),
    Hooks(HooksByAngle),
    Scripts(ScriptBatch),
}

impl StageResult {
    /// The stage this result belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            StageResult::Avatar(_) => Stage::Avatar,
            StageResult::Journey(_) => Stage::Journey,
            StageResult::Objections(_) => Stage::Objections,
            StageResult::Angles(_) => Stage::Angles,
            StageResult::Hooks(_) => Stage::Hooks,
            StageResult::Scripts(_) => Stage::Scripts,
        }
    }

    /// The inner payload as a JSON value, without the stage tag.
    pub fn payload_json(&self) -> Value {
        let result = match self {
            StageResult::Avatar(inner) => serde_json::to_value(inner),
            StageResult::Journey(inner) => serde_json::to_value(inner),
            StageResult::Objections(inner) => serde_json::to_value(inner),
            StageResult::Angles(inner) => serde_json::to_value(inner),
            StageResult::Hooks(inner) => serde_json::to_value(inner),
            StageResult::Scripts(inner) => serde_json::to_value(inner),
        };
        result.unwrap_or(Value::Null)
    }

    /// Returns the angles payload, when this is an angles result.
    pub fn as_angles(&self) -> Option<&AnglesGeneration> {
        match self {
            StageResult::Angles(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns the hooks payload, when this is a hooks result.
    pub fn as_hooks(&self) -> Option<&HooksByAngle> {
        match self {
            StageResult::Hooks(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns the scripts payload, when this is a scripts result.
    pub fn as_scripts(&self) -> Option<&ScriptBatch> {
        match self {
            StageResult::Scripts(inner) => Some(inner),
            _ => None,
        }
    }
}
