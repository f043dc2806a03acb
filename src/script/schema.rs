//! Mod script data model.
//!
//! Scripts are JSON files with a flat action list. An action names its
//! target config file explicitly or inherits it from the nearest
//! preceding action in the same script; the first action must name one.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ActionType {
    Modify,
    Add,
    RemoveLine,
    RemoveStruct,
    AddStruct,
    Replace,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::Modify => "Modify",
            ActionType::Add => "Add",
            ActionType::RemoveLine => "RemoveLine",
            ActionType::RemoveStruct => "RemoveStruct",
            ActionType::AddStruct => "AddStruct",
            ActionType::Replace => "Replace",
        };
        f.write_str(name)
    }
}

/// One action as authored in a mod script. `file` may be omitted and
/// inherited; `resolve` produces the engine-facing form.
#[derive(Debug, Clone, Deserialize)]
pub struct ModAction {
    #[serde(rename = "type")]
    pub action: ActionType,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub path: String,
    /// Present on Modify when several keys of one structure change at
    /// once (ModifyMultiple); iteration order is author-written order.
    #[serde(default)]
    pub values: Option<Map<String, Value>>,
    #[serde(default)]
    pub value: Option<Value>,
    /// Present on AddStruct when appending several structures.
    #[serde(default)]
    pub structures: Option<Vec<Value>>,
    #[serde(default, rename = "isRegex")]
    pub is_regex: bool,
}

impl ModAction {
    /// Attach the effective target file, applying inheritance.
    pub fn resolve(&self, file: &str) -> ConfigAction {
        ConfigAction {
            action: self.action,
            file: file.to_string(),
            path: self.path.clone(),
            value: self.value.clone(),
            values: self.values.clone(),
            structures: self.structures.clone(),
            is_regex: self.is_regex,
        }
    }
}

/// An action with its target file resolved. This is what the patch
/// engine and the conflict detector consume.
#[derive(Debug, Clone)]
pub struct ConfigAction {
    pub action: ActionType,
    pub file: String,
    pub path: String,
    pub value: Option<Value>,
    pub values: Option<Map<String, Value>>,
    pub structures: Option<Vec<Value>>,
    pub is_regex: bool,
}

impl ConfigAction {
    /// Short human-readable form for progress output.
    pub fn describe(&self) -> String {
        match self.action {
            ActionType::Replace => format!("Replace in {}", self.file),
            _ => format!("{} {}", self.action, self.path),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModScript {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<ModAction>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl ModScript {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.actions.is_empty() {
            issues.push(ValidationIssue::EmptyActionList);
        }

        if let Some(first) = self.actions.first() {
            if first.file.as_deref().unwrap_or("").is_empty() {
                issues.push(ValidationIssue::FirstActionMissingFile);
            }
        }

        for (index, action) in self.actions.iter().enumerate() {
            match action.action {
                ActionType::Replace => {
                    if replace_texts(action.value.as_ref()).is_none() {
                        issues.push(ValidationIssue::BadReplacePayload { index });
                    }
                }
                _ => {
                    if action.path.trim().is_empty() {
                        issues.push(ValidationIssue::MissingPath {
                            index,
                            action: action.action,
                        });
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Extract the `old`/`new` texts from a Replace payload, if well-formed.
pub fn replace_texts(value: Option<&Value>) -> Option<(String, String)> {
    let map = value?.as_object()?;
    let old = value_text(map.get("old")?);
    let new = value_text(map.get("new")?);
    Some((old, new))
}

/// String representation used for Replace payloads and conflict value
/// comparison: JSON strings compare by their unquoted text, everything
/// else by its serialized JSON text.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    EmptyActionList,
    FirstActionMissingFile,
    MissingPath { index: usize, action: ActionType },
    BadReplacePayload { index: usize },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyActionList => write!(f, "script contains no actions"),
            ValidationIssue::FirstActionMissingFile => {
                write!(f, "first action must name a target file")
            }
            ValidationIssue::MissingPath { index, action } => {
                write!(f, "action {index} ({action}) is missing a path")
            }
            ValidationIssue::BadReplacePayload { index } => {
                write!(
                    f,
                    "action {index} (Replace) needs a value object with 'old' and 'new'"
                )
            }
        }
    }
}
