//! Runs mod scripts through the patch engine.
//!
//! One engine instance serializes all actions of a batch. The
//! processor owns the save boundary: it saves the open document when
//! an action switches to a different file and again after a script's
//! final action. A failing action aborts the rest of its script and
//! drops its unsaved buffer, while the rest of the batch continues.

use crate::cfg::editor::{ActionOutcome, PatchEngine};
use crate::cfg::errors::PatchError;
use crate::script::schema::ModScript;
use crate::store::ConfigStore;
use std::collections::BTreeMap;
use std::path::Path;

/// One successfully applied action, for progress reporting.
#[derive(Debug)]
pub struct AppliedAction {
    pub index: usize,
    pub description: String,
    pub outcome: ActionOutcome,
}

/// Result of one script: the actions that were applied and, when the
/// script aborted early, the error that stopped it.
#[derive(Debug)]
pub struct ScriptOutcome {
    pub script: String,
    pub applied: Vec<AppliedAction>,
    pub error: Option<PatchError>,
}

impl ScriptOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct ModProcessor<S> {
    engine: PatchEngine<S>,
}

impl<S: ConfigStore> ModProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            engine: PatchEngine::new(store),
        }
    }

    /// Process scripts in map order, continuing past failing scripts.
    pub fn process_all(
        &mut self,
        scripts: &BTreeMap<String, ModScript>,
    ) -> (Vec<ScriptOutcome>, ProcessSummary) {
        let mut outcomes = Vec::with_capacity(scripts.len());
        for (name, script) in scripts {
            outcomes.push(self.process_script(name, script));
        }

        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        let summary = ProcessSummary {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        };
        (outcomes, summary)
    }

    /// Apply one script action-by-action, resolving file-context
    /// inheritance as a fold over the action order.
    pub fn process_script(&mut self, name: &str, script: &ModScript) -> ScriptOutcome {
        let outcome = self.run_script(name, script);
        if !outcome.succeeded() {
            // The aborted script's unsaved edits must not survive into
            // the next script's buffer.
            self.engine.reset();
        }
        outcome
    }

    fn run_script(&mut self, name: &str, script: &ModScript) -> ScriptOutcome {
        let mut outcome = ScriptOutcome {
            script: name.to_string(),
            applied: Vec::new(),
            error: None,
        };
        let mut current_file: Option<String> = None;

        for (index, action) in script.actions.iter().enumerate() {
            match action.file.as_deref().filter(|f| !f.is_empty()) {
                Some(file) => {
                    // Flush the open document before switching files
                    if current_file.as_deref().is_some_and(|prev| prev != file) {
                        if let Err(err) = self.engine.save_file() {
                            outcome.error = Some(err);
                            return outcome;
                        }
                    }
                    current_file = Some(file.to_string());
                }
                None if current_file.is_none() => {
                    outcome.error = Some(PatchError::MalformedAction {
                        message: format!("action {index} has no target file"),
                    });
                    return outcome;
                }
                None => {}
            }

            let file = current_file.as_deref().unwrap_or_default();
            let resolved = action.resolve(file);
            match self.engine.apply_action(&resolved) {
                Ok(result) => outcome.applied.push(AppliedAction {
                    index,
                    description: resolved.describe(),
                    outcome: result,
                }),
                Err(err) => {
                    outcome.error = Some(err);
                    return outcome;
                }
            }
        }

        if current_file.is_some() {
            if let Err(err) = self.engine.save_file() {
                outcome.error = Some(err);
            }
        }
        outcome
    }
}

/// Render a changelog section per script that carries a description.
pub fn generate_changelog(scripts: &BTreeMap<String, ModScript>) -> String {
    let mut out = String::from("# Changelog\n\n");
    for (name, script) in scripts {
        if script.description.trim().is_empty() {
            continue;
        }
        let stem = Path::new(name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        out.push_str(&format!("## {stem}\n- {}\n\n", script.description));
    }
    out
}
