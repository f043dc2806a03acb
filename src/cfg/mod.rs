//! Core config-text machinery: paths, the structure locator, value
//! formatting, and the patch action engine.

pub mod editor;
pub mod errors;
pub mod formatter;
pub mod locator;
pub mod path;

pub use editor::{ActionOutcome, PatchEngine};
pub use errors::PatchError;
pub use formatter::{format_value, INDENT_SIZE, STRUCT_BEGIN, STRUCT_END};
pub use locator::{find_structure, StructureSpan};
pub use path::{ConfigPath, PathComponent};
