//! Mod script model and loading.

pub mod loader;
pub mod schema;

pub use loader::{load_script, load_scripts, required_config_files, ScriptError};
pub use schema::{ActionType, ConfigAction, ModAction, ModScript, ValidationError};
