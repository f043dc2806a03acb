//! Patch Action Engine: applies mod actions to an in-memory line buffer.
//!
//! The engine holds at most one open document. An action targeting a
//! different file loads that file's lines as the new document; it never
//! saves implicitly. Callers own the save boundary (see
//! [`crate::processor`]); skipping `save_file` silently discards
//! in-memory edits.
//!
//! A failing action leaves edits already applied to the buffer in
//! place; there is no rollback.

use crate::cfg::errors::PatchError;
use crate::cfg::formatter::{format_value, indent, INDENT_SIZE, STRUCT_BEGIN, STRUCT_END};
use crate::cfg::locator::{find_structure, StructureSpan};
use crate::cfg::path::{join_components, ConfigPath, PathComponent};
use crate::script::schema::{replace_texts, ActionType, ConfigAction};
use crate::store::ConfigStore;
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// What applying one action did to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "Replace outcomes carry the match count callers should check"]
pub enum ActionOutcome {
    Applied,
    /// A Replace ran over the whole document; zero replacements is a
    /// soft warning for the caller, not an error.
    Replaced { count: usize },
}

pub struct PatchEngine<S> {
    store: S,
    current_file: Option<String>,
    lines: Vec<String>,
}

impl<S: ConfigStore> PatchEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            current_file: None,
            lines: Vec::new(),
        }
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    /// The open document's lines. Empty when nothing is loaded.
    pub fn document(&self) -> &[String] {
        &self.lines
    }

    /// Apply one action, loading its target file first if it differs
    /// from the open document. The previous document is not saved.
    pub fn apply_action(&mut self, action: &ConfigAction) -> Result<ActionOutcome, PatchError> {
        if self.current_file.as_deref() != Some(action.file.as_str()) {
            self.lines = self.store.read_lines(&action.file)?;
            self.current_file = Some(action.file.clone());
        }

        if action.action == ActionType::Replace {
            let (old, new) = replace_texts(action.value.as_ref()).ok_or_else(|| {
                PatchError::MalformedAction {
                    message: "Replace action requires 'old' and 'new' values".to_string(),
                }
            })?;
            let count = self.replace_substrings(&old, &new, action.is_regex)?;
            return Ok(ActionOutcome::Replaced { count });
        }

        let path = ConfigPath::parse(&action.path)?;

        match action.action {
            ActionType::Modify => match &action.values {
                Some(values) => self.modify_multiple_values(&path, values)?,
                None => self.modify_value(&path, action.value.as_ref())?,
            },
            ActionType::Add => self.add_value(&path, action.value.as_ref())?,
            ActionType::RemoveLine => self.remove_line(&path)?,
            ActionType::RemoveStruct => self.remove_struct(&path)?,
            ActionType::AddStruct => match &action.structures {
                Some(structures) if path.last().is_index() => {
                    self.add_multiple_named_structures(&path, structures)?
                }
                Some(structures) => self.add_multiple_structures(&path, structures)?,
                None => {
                    let structure = action.value.as_ref().and_then(|v| v.as_object()).ok_or_else(
                        || PatchError::MalformedAction {
                            message: "AddStruct action requires an object value".to_string(),
                        },
                    )?;
                    self.add_structure(&path, structure)?
                }
            },
            ActionType::Replace => unreachable!("handled above"),
        }

        Ok(ActionOutcome::Applied)
    }

    /// Drop the open document without saving it.
    pub fn reset(&mut self) {
        self.current_file = None;
        self.lines.clear();
    }

    /// Write the open document back to its file.
    pub fn save_file(&mut self) -> Result<(), PatchError> {
        let file = self
            .current_file
            .as_deref()
            .ok_or(PatchError::NoDocumentLoaded)?;
        self.store.write_lines(file, &self.lines)?;
        Ok(())
    }

    fn locate(&self, target: &[PathComponent]) -> Result<StructureSpan, PatchError> {
        find_structure(&self.lines, target).ok_or_else(|| PatchError::StructureNotFound {
            path: join_components(target),
        })
    }

    /// Find the `key = ` line within a span; returns its index and the
    /// original leading whitespace.
    fn find_value_line(
        &self,
        span: StructureSpan,
        key: &str,
    ) -> Result<(usize, String), PatchError> {
        for i in span.start..=span.end {
            let line = &self.lines[i];
            let trimmed = line.trim_start();
            if trimmed.starts_with(&format!("{key} =")) {
                return Ok((i, line[..line.len() - trimmed.len()].to_string()));
            }
        }
        Err(PatchError::KeyNotFound {
            key: key.to_string(),
        })
    }

    fn set_value_line(
        &mut self,
        span: StructureSpan,
        key: &str,
        value: &Value,
    ) -> Result<(), PatchError> {
        let (line_no, indentation) = self.find_value_line(span, key)?;
        let text = format_value(value, indentation.len())?;
        self.lines[line_no] = format!("{indentation}{key} = {text}");
        Ok(())
    }

    fn modify_value(&mut self, path: &ConfigPath, value: Option<&Value>) -> Result<(), PatchError> {
        let span = self.locate(path.parent())?;
        let null = Value::Null;
        let value = value.unwrap_or(&null);
        self.set_value_line(span, path.last().as_str(), value)
    }

    fn modify_multiple_values(
        &mut self,
        path: &ConfigPath,
        values: &Map<String, Value>,
    ) -> Result<(), PatchError> {
        let span = self.locate(path.components())?;
        for (key, value) in values {
            self.set_value_line(span, key, value)?;
        }
        Ok(())
    }

    fn add_value(&mut self, path: &ConfigPath, value: Option<&Value>) -> Result<(), PatchError> {
        let span = self.locate(path.parent())?;
        let null = Value::Null;
        let value = value.unwrap_or(&null);
        let new_line = format!(
            "{}{} = {}",
            indent(INDENT_SIZE),
            path.last(),
            format_value(value, INDENT_SIZE)?
        );

        // Insert right before the parent's closing marker
        for i in (span.start..=span.end).rev() {
            if self.lines[i].contains(STRUCT_END) {
                self.lines.insert(i, new_line);
                break;
            }
        }
        Ok(())
    }

    fn remove_line(&mut self, path: &ConfigPath) -> Result<(), PatchError> {
        let span = self.locate(path.parent())?;
        let key = path.last().as_str();

        for i in span.start..=span.end {
            if self.lines[i].trim().starts_with(key) {
                // Take an immediately preceding comment with it
                if i > 0 && self.lines[i - 1].trim().starts_with("//") {
                    self.lines.remove(i - 1);
                    self.lines.remove(i - 1);
                } else {
                    self.lines.remove(i);
                }
                break;
            }
        }
        Ok(())
    }

    fn remove_struct(&mut self, path: &ConfigPath) -> Result<(), PatchError> {
        let span = self.locate(path.components())?;
        self.lines.drain(span.start..=span.end);
        Ok(())
    }

    fn add_structure(
        &mut self,
        path: &ConfigPath,
        structure: &Map<String, Value>,
    ) -> Result<(), PatchError> {
        let parent = path.parent();
        let span = self.locate(parent)?;
        let name = path.last().as_str();

        // Indent one unit deeper than the parent's own opening line
        let parent_line = &self.lines[span.start];
        let parent_name = parent
            .last()
            .map(PathComponent::as_str)
            .unwrap_or_default();
        let base_width = parent_line.find(parent_name).unwrap_or(0);
        let base = indent(base_width + INDENT_SIZE);

        let mut new_lines = Vec::with_capacity(structure.len() + 2);
        new_lines.push(format!("{base}{name} : {STRUCT_BEGIN}"));
        for (key, value) in structure {
            let entry_indent = base_width + 2 * INDENT_SIZE;
            new_lines.push(format!(
                "{base}{}{key} = {}",
                indent(INDENT_SIZE),
                format_value(value, entry_indent)?
            ));
        }
        new_lines.push(format!("{base}{STRUCT_END}"));

        self.lines.splice(span.end..span.end, new_lines);
        Ok(())
    }

    fn add_multiple_structures(
        &mut self,
        parent_path: &ConfigPath,
        structures: &[Value],
    ) -> Result<(), PatchError> {
        let span = self.locate(parent_path.components())?;

        // Highest existing [n] element in the parent's body
        let mut last_index: i64 = -1;
        for i in span.start..=span.end {
            if let Some(captures) = array_index_regex().captures(self.lines[i].trim_start()) {
                if let Ok(index) = captures[1].parse::<i64>() {
                    last_index = last_index.max(index);
                }
            }
        }

        for (offset, structure) in structures.iter().enumerate() {
            let next_index = last_index + 1 + offset as i64;
            let element_path =
                parent_path.child(PathComponent::Index(format!("[{next_index}]")));
            let map = structure
                .as_object()
                .ok_or_else(|| PatchError::MalformedAction {
                    message: format!("invalid structure format at index {offset}"),
                })?;
            self.add_structure(&element_path, map)?;
        }
        Ok(())
    }

    fn add_multiple_named_structures(
        &mut self,
        parent_path: &ConfigPath,
        structures: &[Value],
    ) -> Result<(), PatchError> {
        self.locate(parent_path.components())?;

        // Each item is a one-entry map {name -> structure}
        for structure in structures {
            let Some(entries) = structure.as_object() else {
                continue;
            };
            for (name, value) in entries {
                if let Some(map) = value.as_object() {
                    let child_path = parent_path.child(PathComponent::Name(name.clone()));
                    self.add_structure(&child_path, map)?;
                }
            }
        }
        Ok(())
    }

    /// Whole-document substitution; returns the replacement count.
    fn replace_substrings(
        &mut self,
        old_text: &str,
        new_text: &str,
        is_regex: bool,
    ) -> Result<usize, PatchError> {
        let mut replacements = 0;

        if is_regex {
            let pattern = RegexBuilder::new(old_text).multi_line(true).build()?;
            for line in &mut self.lines {
                let matches = pattern.find_iter(line).count();
                if matches == 0 {
                    continue;
                }
                let replaced = pattern.replace_all(line, new_text);
                if replaced != *line {
                    replacements += matches;
                    *line = replaced.into_owned();
                }
            }
        } else {
            for line in &mut self.lines {
                if !line.contains(old_text) {
                    continue;
                }
                let replaced = line.replace(old_text, new_text);
                if replaced != *line {
                    replacements += 1;
                    *line = replaced;
                }
            }
        }

        Ok(replacements)
    }
}

fn array_index_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[(\d+)\]").expect("static pattern"))
}
