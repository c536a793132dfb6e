//! Canonicalization of parsed LLM payloads into typed stage results.
//!
//! The model spells the same field several ways across responses
//! (`angle_concept` vs `concept`, `hook_text` vs `text`, bare strings vs
//! structured hook objects). Each stage has exactly one adapter here that
//! maps every known alternate spelling onto the canonical typed shape, so
//! the tolerance logic lives in one place per stage.
//!
//! Required fields missing from the payload abort the stage
//! ([`GenerationError::MissingField`]); missing optional fields are logged
//! as warnings and defaulted — a sparse marketing analysis is usable, just
//! lower quality.

use serde_json::{Map, Value};

use crate::error::{GenerationError, GenerationResult};
use crate::pipeline::context::Stage;
use crate::pipeline::stages::{
    AnglePolarity, AnglesGeneration, AvatarAnalysis, CustomerJourney, Hook, HooksByAngle,
    JourneyStage, MarketingAngle, Objection, ObjectionsAnalysis, ScriptBatch, ScriptRecord,
    StageResult,
};

/// Adapts a parsed payload into the typed result for the given stage.
///
/// `raw` is the original response text, used only for error previews.
pub fn adapt_stage(stage: Stage, payload: Value, raw: &str) -> GenerationResult<StageResult> {
    match stage {
        Stage::Avatar => adapt_avatar(payload, raw).map(StageResult::Avatar),
        Stage::Journey => adapt_journey(payload, raw).map(StageResult::Journey),
        Stage::Objections => adapt_objections(payload, raw).map(StageResult::Objections),
        Stage::Angles => adapt_angles(payload, raw).map(StageResult::Angles),
        Stage::Hooks => adapt_hooks(payload, raw).map(StageResult::Hooks),
        Stage::Scripts => adapt_scripts(payload, raw).map(StageResult::Scripts),
    }
}

fn adapt_avatar(payload: Value, raw: &str) -> GenerationResult<AvatarAnalysis> {
    let map = as_object(Stage::Avatar, &payload, raw)?;

    let pain_points = take_string_vec(map, &["pain_points", "pains"]);
    if pain_points.is_empty() {
        return Err(GenerationError::MissingField {
            stage: Stage::Avatar,
            field: "pain_points",
        });
    }

    let avatar_name = take_string(map, &["avatar_name", "name", "persona_name"])
        .unwrap_or_else(|| warn_missing(Stage::Avatar, "avatar_name"));
    let demographics = take_value(map, &["demographics"]);
    if demographics.is_none() {
        warn_missing(Stage::Avatar, "demographics");
    }
    let psychographics = take_value(map, &["psychographics"]);
    if psychographics.is_none() {
        warn_missing(Stage::Avatar, "psychographics");
    }
    let desires = take_string_vec(map, &["desires", "wants"]);
    if desires.is_empty() {
        warn_missing(Stage::Avatar, "desires");
    }

    Ok(AvatarAnalysis {
        avatar_name,
        demographics,
        psychographics,
        pain_points,
        desires,
        buying_triggers: take_string_vec(map, &["buying_triggers", "triggers"]),
    })
}

fn adapt_journey(payload: Value, raw: &str) -> GenerationResult<CustomerJourney> {
    let map = as_object(Stage::Journey, &payload, raw)?;

    let Some(items) = take_array(map, &["stages", "journey_stages", "steps"]) else {
        return Err(GenerationError::MissingField {
            stage: Stage::Journey,
            field: "stages",
        });
    };

    let mut stages = Vec::with_capacity(items.len());
    for item in &items {
        let Some(item_map) = item.as_object() else {
            return Err(GenerationError::malformed(
                Stage::Journey,
                "journey stage entry is not an object",
                raw,
            ));
        };
        let Some(name) = take_string(item_map, &["name", "stage", "step_name"]) else {
            return Err(GenerationError::MissingField {
                stage: Stage::Journey,
                field: "stages[].name",
            });
        };
        stages.push(JourneyStage {
            name,
            description: take_string(item_map, &["description", "details"]).unwrap_or_default(),
            emotional_state: take_string(item_map, &["emotional_state", "emotion"])
                .unwrap_or_default(),
            touchpoints: take_string_vec(item_map, &["touchpoints"]),
        });
    }

    if stages.is_empty() {
        return Err(GenerationError::MissingField {
            stage: Stage::Journey,
            field: "stages",
        });
    }

    let summary = take_string(map, &["summary", "overview"])
        .unwrap_or_else(|| warn_missing(Stage::Journey, "summary"));

    Ok(CustomerJourney { summary, stages })
}

fn adapt_objections(payload: Value, raw: &str) -> GenerationResult<ObjectionsAnalysis> {
    let map = as_object(Stage::Objections, &payload, raw)?;

    let Some(items) = take_array(map, &["objections", "objection_list"]) else {
        return Err(GenerationError::MissingField {
            stage: Stage::Objections,
            field: "objections",
        });
    };

    let mut objections = Vec::with_capacity(items.len());
    for item in &items {
        let Some(item_map) = item.as_object() else {
            return Err(GenerationError::malformed(
                Stage::Objections,
                "objection entry is not an object",
                raw,
            ));
        };
        let Some(text) = take_string(item_map, &["objection", "text"]) else {
            return Err(GenerationError::MissingField {
                stage: Stage::Objections,
                field: "objections[].objection",
            });
        };
        let rebuttal = take_string(item_map, &["rebuttal", "counter", "response"])
            .unwrap_or_else(|| warn_missing(Stage::Objections, "objections[].rebuttal"));
        objections.push(Objection {
            text,
            rebuttal,
            severity: take_string(item_map, &["severity"]),
        });
    }

    if objections.is_empty() {
        return Err(GenerationError::MissingField {
            stage: Stage::Objections,
            field: "objections",
        });
    }

    Ok(ObjectionsAnalysis { objections })
}

fn adapt_angles(payload: Value, raw: &str) -> GenerationResult<AnglesGeneration> {
    let map = as_object(Stage::Angles, &payload, raw)?;

    let supportive_items = take_array(map, &["supportive_angles", "supportive", "positive_angles"])
        .unwrap_or_default();
    let counter_items = take_array(
        map,
        &["counter_angles", "counter", "counter_positioning_angles", "negative_angles"],
    )
    .unwrap_or_default();

    let supportive = adapt_angle_bucket(&supportive_items, AnglePolarity::Positive, raw)?;
    let counter = adapt_angle_bucket(&counter_items, AnglePolarity::Negative, raw)?;

    if supportive.is_empty() && counter.is_empty() {
        return Err(GenerationError::MissingField {
            stage: Stage::Angles,
            field: "angles",
        });
    }

    Ok(AnglesGeneration { supportive, counter })
}

/// Maps one bucket's raw items 1:1 into [`MarketingAngle`]s.
///
/// A missing `angle_type` defaults to the bucket's implied polarity rather
/// than failing.
fn adapt_angle_bucket(
    items: &[Value],
    bucket_polarity: AnglePolarity,
    raw: &str,
) -> GenerationResult<Vec<MarketingAngle>> {
    let mut angles = Vec::with_capacity(items.len());
    for (position, item) in items.iter().enumerate() {
        let Some(item_map) = item.as_object() else {
            return Err(GenerationError::malformed(
                Stage::Angles,
                "angle entry is not an object",
                raw,
            ));
        };

        let Some(concept) = take_string(item_map, &["angle_concept", "concept"]) else {
            return Err(GenerationError::MissingField {
                stage: Stage::Angles,
                field: "angles[].angle_concept",
            });
        };

        let angle_number = take_u32(item_map, &["angle_number", "number"])
            .unwrap_or(position as u32 + 1);
        let angle_id = take_string(item_map, &["angle_id", "id"])
            .unwrap_or_else(|| format!("angle_{}", angle_number));
        let category = take_string(item_map, &["angle_category", "category"]).unwrap_or_else(|| {
            warn_missing(Stage::Angles, "angles[].angle_category")
        });
        let polarity = take_string(item_map, &["angle_type", "type"])
            .and_then(|t| match t.to_lowercase().trim() {
                "positive" | "supportive" => Some(AnglePolarity::Positive),
                "negative" | "counter" => Some(AnglePolarity::Negative),
                _ => None,
            })
            .unwrap_or(bucket_polarity);

        angles.push(MarketingAngle {
            angle_id,
            angle_number,
            category,
            concept,
            polarity,
        });
    }
    Ok(angles)
}

fn adapt_hooks(payload: Value, raw: &str) -> GenerationResult<HooksByAngle> {
    let map = as_object(Stage::Hooks, &payload, raw)?;

    let mut hooks = Vec::new();
    for (angle_id, categories) in map {
        let Some(categories_map) = categories.as_object() else {
            return Err(GenerationError::malformed(
                Stage::Hooks,
                format!("hook list for '{}' is not keyed by category", angle_id),
                raw,
            ));
        };

        // Position counts across the whole angle so synthetic ids stay
        // unique when several categories are present.
        let mut position = 0usize;
        for (category, entries) in categories_map {
            let Some(entries) = entries.as_array() else {
                return Err(GenerationError::malformed(
                    Stage::Hooks,
                    format!("hook category '{}' is not an array", category),
                    raw,
                ));
            };
            for entry in entries {
                hooks.push(adapt_hook_entry(entry, angle_id, category, position, raw)?);
                position += 1;
            }
        }
    }

    if hooks.is_empty() {
        return Err(GenerationError::MissingField {
            stage: Stage::Hooks,
            field: "hooks",
        });
    }

    Ok(HooksByAngle { hooks })
}

/// Accepts both hook entry shapes: a structured object (`hook_id`,
/// `hook_text`, `hook_category`) or, for backward compatibility, a bare
/// string, in which case a synthetic id `angle_<n>_<position+1>` is
/// generated and the category is taken from the enclosing key.
fn adapt_hook_entry(
    entry: &Value,
    angle_id: &str,
    category: &str,
    position: usize,
    raw: &str,
) -> GenerationResult<Hook> {
    match entry {
        Value::String(text) => Ok(Hook {
            hook_id: format!("{}_{}", angle_id, position + 1),
            text: text.clone(),
            category: category.to_string(),
        }),
        Value::Object(entry_map) => {
            let Some(text) = take_string(entry_map, &["hook_text", "text"]) else {
                return Err(GenerationError::MissingField {
                    stage: Stage::Hooks,
                    field: "hooks[].hook_text",
                });
            };
            Ok(Hook {
                hook_id: take_string(entry_map, &["hook_id", "id"])
                    .unwrap_or_else(|| format!("{}_{}", angle_id, position + 1)),
                text,
                category: take_string(entry_map, &["hook_category", "category"])
                    .unwrap_or_else(|| category.to_string()),
            })
        }
        _ => Err(GenerationError::malformed(
            Stage::Hooks,
            "hook entry is neither an object nor a string",
            raw,
        )),
    }
}

fn adapt_scripts(payload: Value, raw: &str) -> GenerationResult<ScriptBatch> {
    // The scripts payload arrives either as {"scripts": [...]} or, once the
    // wrapper key has been unwrapped, as the bare array itself.
    let items: Vec<Value> = match &payload {
        Value::Array(items) => items.clone(),
        Value::Object(map) => take_array(map, &["scripts", "script_list"]).unwrap_or_default(),
        _ => {
            return Err(GenerationError::malformed(
                Stage::Scripts,
                "scripts payload is neither an object nor an array",
                raw,
            ))
        }
    };

    if items.is_empty() {
        return Err(GenerationError::MissingField {
            stage: Stage::Scripts,
            field: "scripts",
        });
    }

    let mut scripts = Vec::with_capacity(items.len());
    for item in &items {
        let Some(item_map) = item.as_object() else {
            return Err(GenerationError::malformed(
                Stage::Scripts,
                "script entry is not an object",
                raw,
            ));
        };
        let Some(script_id) = take_string(item_map, &["script_id", "id"]) else {
            return Err(GenerationError::MissingField {
                stage: Stage::Scripts,
                field: "scripts[].script_id",
            });
        };
        let Some(content) = take_string(item_map, &["content", "script", "text"]) else {
            return Err(GenerationError::MissingField {
                stage: Stage::Scripts,
                field: "scripts[].content",
            });
        };
        let cta = take_string(item_map, &["cta", "call_to_action"])
            .unwrap_or_else(|| warn_missing(Stage::Scripts, "scripts[].cta"));
        let target_emotion = take_string(item_map, &["target_emotion", "emotion"])
            .unwrap_or_else(|| warn_missing(Stage::Scripts, "scripts[].target_emotion"));

        scripts.push(ScriptRecord {
            script_id,
            content,
            cta,
            target_emotion,
        });
    }

    Ok(ScriptBatch { scripts })
}

// ---------------------------------------------------------------------------
// Key-lookup helpers
// ---------------------------------------------------------------------------

fn as_object<'a>(
    stage: Stage,
    payload: &'a Value,
    raw: &str,
) -> GenerationResult<&'a Map<String, Value>> {
    payload
        .as_object()
        .ok_or_else(|| GenerationError::malformed(stage, "payload is not a JSON object", raw))
}

/// Returns the first non-empty string found under any of the given keys.
fn take_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        map.get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Returns the first array found under any of the given keys.
fn take_array(map: &Map<String, Value>, keys: &[&str]) -> Option<Vec<Value>> {
    keys.iter()
        .find_map(|key| map.get(*key).and_then(Value::as_array).cloned())
}

/// Returns the first value found under any of the given keys, nulls excluded.
fn take_value(map: &Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()).cloned())
}

/// Returns the first unsigned integer found under any of the given keys.
/// Numbers arriving as strings are accepted.
fn take_u32(map: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|key| {
        let value = map.get(*key)?;
        match value {
            Value::Number(n) => n.as_u64().map(|n| n as u32),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    })
}

/// Collects an array of strings under any of the given keys; non-string
/// entries are ignored.
fn take_string_vec(map: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    take_array(map, keys)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Logs a missing optional field and returns the empty default.
fn warn_missing(stage: Stage, field: &str) -> String {
    tracing::warn!(stage = %stage, field, "stage result missing optional field");
    String::new()
}
