//! Zona Patcher: structural patching for hierarchical game config files
//!
//! Applies declarative mod scripts to a proprietary text format of
//! nested `struct.begin`/`struct.end` blocks and `key = value` leaves,
//! and detects clashes between independently authored scripts before
//! anything is mutated.
//!
//! # Architecture
//!
//! There is no AST: structures are located by a single stack-based scan
//! over raw lines ([`cfg::locator`]), and every action mutates an
//! in-memory line buffer owned by the [`cfg::editor::PatchEngine`].
//! The engine holds one document at a time and never saves implicitly;
//! [`processor::ModProcessor`] owns the save boundary.
//!
//! # Workflow
//!
//! 1. Load mod scripts ([`script::load_scripts`]).
//! 2. Run conflict detection ([`conflict::detect_conflicts`]); a
//!    non-empty result blocks the whole batch, fail-closed.
//! 3. Process each script ([`processor::ModProcessor::process_all`]);
//!    a failing action aborts only its own script.

pub mod cfg;
pub mod conflict;
pub mod processor;
pub mod report;
pub mod script;
pub mod store;

// Re-exports
pub use cfg::{
    find_structure, format_value, ActionOutcome, ConfigPath, PatchEngine, PatchError,
    PathComponent, StructureSpan,
};
pub use conflict::{detect_conflicts, ConflictRecord};
pub use processor::{generate_changelog, ModProcessor, ProcessSummary, ScriptOutcome};
pub use script::{
    load_script, load_scripts, required_config_files, ActionType, ConfigAction, ModAction,
    ModScript, ScriptError,
};
pub use store::{ConfigStore, DirStore, StoreError};
