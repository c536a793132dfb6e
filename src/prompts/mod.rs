//! Prompt template store.
//!
//! Stage prompts are structured YAML documents (one per stage) with
//! optional `role`, `instructions`, and `output_format` sections, loaded
//! once at process start from a directory. The store is read-only after
//! initialization and safe to share across concurrent runs without
//! locking.
//!
//! A missing stage name yields a default-empty template rather than an
//! error: callers treat every section as optional and omit absent ones
//! from the constructed prompt.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// Expected output description for a stage.
///
/// Documents spell this section either as a free-text `format` or a
/// structured `schema`; both are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    /// Free-text description of the expected output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Structured schema of the expected output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_yaml::Value>,
}

impl OutputFormat {
    /// Renders whichever spelling the document used, preferring `format`.
    /// A structured schema is rendered as pretty JSON.
    pub fn render(&self) -> Option<String> {
        if let Some(format) = &self.format {
            return Some(format.clone());
        }
        self.schema
            .as_ref()
            .and_then(|schema| serde_json::to_value(schema).ok())
            .and_then(|json| serde_json::to_string_pretty(&json).ok())
    }
}

/// A stage prompt template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTemplate {
    /// Stage name this template belongs to. Required in template files.
    #[serde(default)]
    pub stage: String,
    /// System-prompt role section. Optional; some stages fold all
    /// instructions into the user prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Stage-specific instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Expected output description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    /// Other optional named sections carried through verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Read-only store of stage prompt templates.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: HashMap<String, StageTemplate>,
}

impl TemplateStore {
    /// Creates an empty store. Every lookup returns the default template.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads all YAML templates from a directory (non-recursive).
    ///
    /// Files must have a `.yaml` or `.yml` extension. Each file must
    /// declare the stage it belongs to; a duplicate stage is a load error.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, TemplateError> {
        let mut store = Self::default();

        let entries = fs::read_dir(dir.as_ref()).map_err(TemplateError::Io)?;
        for entry in entries {
            let entry = entry.map_err(TemplateError::Io)?;
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == "yaml" || ext == "yml")
                .unwrap_or(false);
            if !is_yaml {
                continue;
            }
            store.load_file(&path)?;
        }

        tracing::debug!(
            templates = store.templates.len(),
            "prompt template store loaded"
        );
        Ok(store)
    }

    fn load_file(&mut self, path: &Path) -> Result<(), TemplateError> {
        let path_str = path.display().to_string();
        let content = fs::read_to_string(path).map_err(TemplateError::Io)?;

        let template: StageTemplate =
            serde_yaml::from_str(&content).map_err(|e| TemplateError::ParseError {
                path: path_str.clone(),
                message: e.to_string(),
            })?;

        if template.stage.trim().is_empty() {
            return Err(TemplateError::MissingStageName { path: path_str });
        }
        if self.templates.contains_key(&template.stage) {
            return Err(TemplateError::DuplicateStage(template.stage.clone()));
        }

        self.templates.insert(template.stage.clone(), template);
        Ok(())
    }

    /// Returns the template for a stage name, or a default-empty template
    /// when the name is absent.
    pub fn get(&self, stage_name: &str) -> StageTemplate {
        self.templates.get(stage_name).cloned().unwrap_or_default()
    }

    /// Number of loaded templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when no templates are loaded.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Loaded stage names, sorted.
    pub fn stages(&self) -> Vec<&str> {
        let mut stages: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        stages.sort_unstable();
        stages
    }
}
