//! Discovers and parses mod scripts from a mods directory.

use crate::script::schema::{ModScript, ValidationError};
use crate::store::normalize_config_path;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read mod script {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse mod script {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid mod script {path}: {source}")]
    Validation {
        path: PathBuf,
        source: ValidationError,
    },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

/// Load every `*.json` script under `mods_dir`, recursively.
///
/// Files whose name starts with `$` are skipped (the convention for
/// disabled scripts). Scripts are keyed by their path relative to the
/// mods directory, which also fixes the processing order.
pub fn load_scripts(mods_dir: &Path) -> Result<BTreeMap<String, ModScript>, ScriptError> {
    let mut scripts = BTreeMap::new();

    for entry in WalkDir::new(mods_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('$') {
            continue;
        }

        let key = path
            .strip_prefix(mods_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        scripts.insert(key, load_script(path)?);
    }

    Ok(scripts)
}

pub fn load_script(path: &Path) -> Result<ModScript, ScriptError> {
    let contents = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let script: ModScript = serde_json::from_str(&contents).map_err(|source| ScriptError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    script.validate().map_err(|source| ScriptError::Validation {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(script)
}

/// The set of config files a batch of scripts will touch, normalized.
/// Callers extract exactly these before any mutation starts.
pub fn required_config_files(scripts: &BTreeMap<String, ModScript>) -> BTreeSet<String> {
    scripts
        .values()
        .flat_map(|script| script.actions.iter())
        .filter_map(|action| action.file.as_deref())
        .map(normalize_config_path)
        .filter(|path| !path.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    const MINIMAL: &str = r#"{
        "description": "test mod",
        "actions": [
            {"type": "Modify", "file": "GameData\\Weapons.cfg", "path": "W::D", "value": 1}
        ]
    }"#;

    #[test]
    fn discovers_scripts_in_name_order_and_skips_disabled() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b_second.json", MINIMAL);
        write(dir.path(), "a_first.json", MINIMAL);
        write(dir.path(), "$disabled.json", MINIMAL);
        write(dir.path(), "notes.txt", "not a script");

        let scripts = load_scripts(dir.path()).unwrap();
        let keys: Vec<&String> = scripts.keys().collect();
        assert_eq!(keys, ["a_first.json", "b_second.json"]);
    }

    #[test]
    fn finds_scripts_in_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pack/mod.json", MINIMAL);

        let scripts = load_scripts(dir.path()).unwrap();
        assert!(scripts.contains_key("pack/mod.json"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.json", "{ not json");
        assert!(matches!(
            load_scripts(dir.path()),
            Err(ScriptError::Json { .. })
        ));
    }

    #[test]
    fn invalid_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "invalid.json", r#"{"actions": []}"#);
        assert!(matches!(
            load_scripts(dir.path()),
            Err(ScriptError::Validation { .. })
        ));
    }

    #[test]
    fn required_files_are_normalized_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", MINIMAL);
        write(
            dir.path(),
            "b.json",
            r#"{"actions": [
                {"type": "Modify", "file": "/GameData/Weapons.cfg", "path": "W::R", "value": 2},
                {"type": "Modify", "file": "GameData/Armor.cfg", "path": "A::V", "value": 3}
            ]}"#,
        );

        let scripts = load_scripts(dir.path()).unwrap();
        let required = required_config_files(&scripts);
        let files: Vec<&String> = required.iter().collect();
        assert_eq!(files, ["GameData/Armor.cfg", "GameData/Weapons.cfg"]);
    }
}
