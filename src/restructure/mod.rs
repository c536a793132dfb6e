//! Script restructuring: flat records → nested angle → hook → script tree.
//!
//! The scripts stage emits a flat list whose composite identity string
//! (`angle_<n>_<m>_<k>`) is the sole encoding of the angle/hook/script
//! hierarchy. This module rebuilds the nested view by parsing those
//! identities. The nested tree is a derived, disposable view — regenerable
//! at any time from the flat list, never the source of truth.
//!
//! The transform is pure and idempotent: one malformed identity is logged
//! and skipped without discarding the rest of the batch.
//!
//! All parsing and formatting of identity strings lives here, in one pair
//! of inverse functions; no other module splits or assembles them.

use serde::{Deserialize, Serialize};

use crate::pipeline::stages::ScriptRecord;

/// Formats a script identity from its components.
///
/// This is the only producer of identity strings: the four-token
/// `angle_<n>_<m>_<k>` format is what [`parse_script_id`] undoes.
pub fn format_script_id(angle: u32, hook: u32, script: u32) -> String {
    format!("angle_{}_{}_{}", angle, hook, script)
}

/// Components parsed out of a script identity string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScriptId {
    /// First two tokens joined, e.g. `angle_1`.
    pub angle_id: String,
    /// First three tokens joined, e.g. `angle_1_5`.
    pub hook_id: String,
    /// Fourth token, kept as text.
    pub script_number: String,
    /// Numeric suffix of the angle id; 0 when unparseable. Display-only,
    /// never a failure condition.
    pub angle_number: u32,
}

/// Parses a script identity string.
///
/// The identity must have at least four underscore-delimited parts; fewer
/// is a malformed-record condition and yields `None`.
pub fn parse_script_id(id: &str) -> Option<ParsedScriptId> {
    let parts: Vec<&str> = id.split('_').collect();
    if parts.len() < 4 {
        return None;
    }

    let angle_id = parts[..2].join("_");
    let hook_id = parts[..3].join("_");
    let angle_number = parts[1].parse().unwrap_or(0);

    Some(ParsedScriptId {
        angle_id,
        hook_id,
        script_number: parts[3].to_string(),
        angle_number,
    })
}

/// A flat script record carrying its parsed parent ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedScript {
    /// Original identity string.
    pub script_id: String,
    /// Parsed angle id, copied forward for consumer convenience.
    pub angle_id: String,
    /// Parsed hook id, copied forward for consumer convenience.
    pub hook_id: String,
    /// Script body.
    pub content: String,
    /// Call to action.
    pub cta: String,
    /// Target emotion tag.
    pub target_emotion: String,
}

/// Scripts grouped under one hook, in encounter order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookGroup {
    /// Hook identity, e.g. `angle_1_5`.
    pub hook_id: String,
    /// Scripts in encounter order.
    pub scripts: Vec<NestedScript>,
}

/// Hooks grouped under one angle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleTree {
    /// Angle identity, e.g. `angle_1`.
    pub angle_id: String,
    /// Numeric suffix of the angle id; 0 when unparseable.
    pub angle_number: u32,
    /// Hook groups in encounter order.
    pub hooks: Vec<HookGroup>,
}

/// The full nested view over a script batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleForest {
    /// Angle trees sorted by angle id string order.
    pub angles: Vec<AngleTree>,
}

impl AngleForest {
    /// Total number of scripts across all hooks.
    pub fn script_count(&self) -> usize {
        self.angles
            .iter()
            .flat_map(|a| a.hooks.iter())
            .map(|h| h.scripts.len())
            .sum()
    }

    /// Total number of hook groups across all angles.
    pub fn hook_count(&self) -> usize {
        self.angles.iter().map(|a| a.hooks.len()).sum()
    }
}

/// Rebuilds the nested angle → hook → script tree from flat records.
///
/// Records whose identity has fewer than four underscore-delimited parts
/// are logged and skipped; one bad record never discards the rest of the
/// batch. Angle and hook nodes are created on first sight; within a hook,
/// scripts keep encounter order. Top-level angles are sorted by angle id
/// STRING order — a deliberate compatibility contract, not numeric order
/// (`angle_10` sorts before `angle_2`).
pub fn restructure(flat_scripts: &[ScriptRecord]) -> AngleForest {
    let mut angles: Vec<AngleTree> = Vec::new();

    for record in flat_scripts {
        let Some(parsed) = parse_script_id(&record.script_id) else {
            tracing::warn!(
                script_id = %record.script_id,
                "skipping script with malformed identity"
            );
            continue;
        };

        let angle = match angles.iter_mut().find(|a| a.angle_id == parsed.angle_id) {
            Some(angle) => angle,
            None => {
                angles.push(AngleTree {
                    angle_id: parsed.angle_id.clone(),
                    angle_number: parsed.angle_number,
                    hooks: Vec::new(),
                });
                angles.last_mut().expect("just pushed")
            }
        };

        let hook = match angle.hooks.iter_mut().find(|h| h.hook_id == parsed.hook_id) {
            Some(hook) => hook,
            None => {
                angle.hooks.push(HookGroup {
                    hook_id: parsed.hook_id.clone(),
                    scripts: Vec::new(),
                });
                angle.hooks.last_mut().expect("just pushed")
            }
        };

        hook.scripts.push(NestedScript {
            script_id: record.script_id.clone(),
            angle_id: parsed.angle_id,
            hook_id: parsed.hook_id,
            content: record.content.clone(),
            cta: record.cta.clone(),
            target_emotion: record.target_emotion.clone(),
        });
    }

    angles.sort_by(|a, b| a.angle_id.cmp(&b.angle_id));

    AngleForest { angles }
}
