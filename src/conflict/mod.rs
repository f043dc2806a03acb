//! Detects clashes between independently authored mod scripts.
//!
//! Detection runs strictly before any file is mutated: a non-empty
//! result must block the whole batch. Conflicts are reported, never
//! resolved.

use crate::script::schema::{replace_texts, value_text, ActionType, ConfigAction, ModScript};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// One clash between two scripts. Immutable once produced.
#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub mod_file1: String,
    pub mod_file2: String,
    pub config_file: String,
    /// `None` for Replace conflicts, which are not tied to a path.
    pub path: Option<String>,
    pub action1: ActionType,
    pub action2: ActionType,
    pub value1: Option<Value>,
    pub value2: Option<Value>,
    pub is_replace_conflict: bool,
}

/// Per-file view of one script's effects. Path actions collapse to the
/// last write per path; Replace actions keep every occurrence.
#[derive(Default)]
struct FileModifications {
    path_actions: BTreeMap<String, ConfigAction>,
    replace_actions: Vec<ConfigAction>,
}

/// Compare every unordered pair of scripts and report clashes on files
/// they both touch. Symmetric in outcome: each pair is examined once.
pub fn detect_conflicts(scripts: &BTreeMap<String, ModScript>) -> Vec<ConflictRecord> {
    let grouped: Vec<(&String, BTreeMap<String, FileModifications>)> = scripts
        .iter()
        .map(|(name, script)| (name, modification_map(script)))
        .collect();

    let mut conflicts = Vec::new();

    for i in 0..grouped.len() {
        for j in i + 1..grouped.len() {
            let (mod1, map1) = &grouped[i];
            let (mod2, map2) = &grouped[j];

            for (file, m1) in map1 {
                let Some(m2) = map2.get(file) else { continue };

                for (path, a1) in &m1.path_actions {
                    if let Some(a2) = m2.path_actions.get(path) {
                        if is_conflicting(a1, a2) {
                            conflicts.push(ConflictRecord {
                                mod_file1: (*mod1).clone(),
                                mod_file2: (*mod2).clone(),
                                config_file: file.clone(),
                                path: Some(path.clone()),
                                action1: a1.action,
                                action2: a2.action,
                                value1: a1.value.clone(),
                                value2: a2.value.clone(),
                                is_replace_conflict: false,
                            });
                        }
                    }
                }

                for r1 in &m1.replace_actions {
                    for r2 in &m2.replace_actions {
                        if is_replace_conflicting(r1, r2) {
                            conflicts.push(ConflictRecord {
                                mod_file1: (*mod1).clone(),
                                mod_file2: (*mod2).clone(),
                                config_file: file.clone(),
                                path: None,
                                action1: r1.action,
                                action2: r2.action,
                                value1: r1.value.clone(),
                                value2: r2.value.clone(),
                                is_replace_conflict: true,
                            });
                        }
                    }
                }

                // A whole-file substitution cannot be proven disjoint
                // from a structural edit, so their co-occurrence is
                // always flagged.
                let cross = (!m1.replace_actions.is_empty() && !m2.path_actions.is_empty())
                    || (!m1.path_actions.is_empty() && !m2.replace_actions.is_empty());
                if cross {
                    conflicts.push(ConflictRecord {
                        mod_file1: (*mod1).clone(),
                        mod_file2: (*mod2).clone(),
                        config_file: file.clone(),
                        path: None,
                        action1: representative_type(m1),
                        action2: representative_type(m2),
                        value1: None,
                        value2: None,
                        is_replace_conflict: true,
                    });
                }
            }
        }
    }

    conflicts
}

/// Group a script's actions per target file, resolving file-context
/// inheritance as an explicit fold over the action order.
fn modification_map(script: &ModScript) -> BTreeMap<String, FileModifications> {
    let mut result: BTreeMap<String, FileModifications> = BTreeMap::new();
    let mut current_file = String::new();

    for action in &script.actions {
        match action.file.as_deref() {
            Some(file) if !file.is_empty() => current_file = file.to_string(),
            // No file seen yet in this script; nothing to attribute to
            _ if current_file.is_empty() => continue,
            _ => {}
        }

        let entry = result.entry(current_file.clone()).or_default();
        let resolved = action.resolve(&current_file);

        if action.action == ActionType::Replace {
            entry.replace_actions.push(resolved);
        } else {
            entry.path_actions.insert(action.path.clone(), resolved);
        }
    }

    result
}

fn representative_type(m: &FileModifications) -> ActionType {
    m.replace_actions
        .first()
        .map(|a| a.action)
        .or_else(|| m.path_actions.values().next().map(|a| a.action))
        .unwrap_or(ActionType::Replace)
}

fn is_conflicting(a1: &ConfigAction, a2: &ConfigAction) -> bool {
    if a1.action != a2.action {
        return true;
    }

    match a1.action {
        ActionType::Modify | ActionType::Add => !values_equal(&a1.value, &a2.value),
        ActionType::RemoveLine | ActionType::RemoveStruct => false,
        ActionType::AddStruct => !structures_equal(&a1.structures, &a2.structures),
        // Replace pairs are analyzed separately
        ActionType::Replace => false,
    }
}

/// Overlap analysis for two whole-file substitutions. Literal pairs
/// conflict only on identical old text; once a regex is involved, both
/// sides are compiled (escaping the literal one) and any cross-match of
/// old or new texts counts, since one replace's output can trigger the
/// other's pattern. Unparseable patterns are a conflict, fail-safe.
fn is_replace_conflicting(r1: &ConfigAction, r2: &ConfigAction) -> bool {
    let (Some((old1, new1)), Some((old2, new2))) = (
        replace_texts(r1.value.as_ref()),
        replace_texts(r2.value.as_ref()),
    ) else {
        return true;
    };

    if !r1.is_regex && !r2.is_regex {
        return old1 == old2;
    }

    let pattern1 = if r1.is_regex { old1.clone() } else { regex::escape(&old1) };
    let pattern2 = if r2.is_regex { old2.clone() } else { regex::escape(&old2) };

    match (Regex::new(&pattern1), Regex::new(&pattern2)) {
        (Ok(re1), Ok(re2)) => {
            re1.is_match(&old2)
                || re2.is_match(&old1)
                || re1.is_match(&new2)
                || re2.is_match(&new1)
        }
        _ => true,
    }
}

fn values_equal(v1: &Option<Value>, v2: &Option<Value>) -> bool {
    match (v1, v2) {
        (None, None) => true,
        (Some(a), Some(b)) => value_text(a) == value_text(b),
        _ => false,
    }
}

fn structures_equal(s1: &Option<Vec<Value>>, s2: &Option<Vec<Value>>) -> bool {
    match (s1, s2) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| value_text(x) == value_text(y))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script(actions: &str) -> ModScript {
        serde_json::from_str(&format!(r#"{{"actions": {actions}}}"#)).unwrap()
    }

    fn batch(entries: &[(&str, &str)]) -> BTreeMap<String, ModScript> {
        entries
            .iter()
            .map(|(name, actions)| (name.to_string(), script(actions)))
            .collect()
    }

    #[test]
    fn same_path_different_values_conflict() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 30}]"#,
            ),
        ]);

        let conflicts = detect_conflicts(&scripts);
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.path.as_deref(), Some("Weapon::Damage"));
        assert_eq!((c.action1, c.action2), (ActionType::Modify, ActionType::Modify));
        assert_eq!(c.value1, Some(json!(25)));
        assert_eq!(c.value2, Some(json!(30)));
        assert!(!c.is_replace_conflict);
    }

    #[test]
    fn same_path_same_value_is_fine() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
        ]);
        assert!(detect_conflicts(&scripts).is_empty());
    }

    #[test]
    fn different_kinds_on_same_path_conflict() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "RemoveLine", "file": "w.cfg", "path": "Weapon::Damage"}]"#,
            ),
        ]);
        let conflicts = detect_conflicts(&scripts);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].action2, ActionType::RemoveLine);
    }

    #[test]
    fn removals_never_conflict_with_themselves() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "RemoveStruct", "file": "w.cfg", "path": "Weapon"}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "RemoveStruct", "file": "w.cfg", "path": "Weapon"}]"#,
            ),
        ]);
        assert!(detect_conflicts(&scripts).is_empty());
    }

    #[test]
    fn different_files_do_not_conflict() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Modify", "file": "x.cfg", "path": "Weapon::Damage", "value": 30}]"#,
            ),
        ]);
        assert!(detect_conflicts(&scripts).is_empty());
    }

    #[test]
    fn literal_replaces_conflict_on_same_old_text() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "Pistol", "new": "Revolver"}}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "Pistol", "new": "Rifle"}}]"#,
            ),
        ]);

        let conflicts = detect_conflicts(&scripts);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].is_replace_conflict);
        assert!(conflicts[0].path.is_none());
    }

    #[test]
    fn literal_replaces_with_disjoint_old_text_are_fine() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "Pistol", "new": "Revolver"}}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "Shotgun", "new": "Rifle"}}]"#,
            ),
        ]);
        assert!(detect_conflicts(&scripts).is_empty());
    }

    #[test]
    fn regex_replace_overlapping_a_literal_conflicts() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "Pistol", "new": "X"}}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "P.stol", "new": "Y"}, "isRegex": true}]"#,
            ),
        ]);

        let conflicts = detect_conflicts(&scripts);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].is_replace_conflict);
    }

    #[test]
    fn regex_matching_the_other_replacement_output_conflicts() {
        // B's replacement text would be re-matched by A's pattern
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "Gauss\\w*", "new": "Railgun"}, "isRegex": true}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "OldRifle", "new": "GaussRifle"}}]"#,
            ),
        ]);
        assert_eq!(detect_conflicts(&scripts).len(), 1);
    }

    #[test]
    fn invalid_regex_is_a_conflict() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "[bad", "new": "x"}, "isRegex": true}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "fine", "new": "y"}}]"#,
            ),
        ]);
        assert_eq!(detect_conflicts(&scripts).len(), 1);
    }

    #[test]
    fn replace_and_path_action_on_same_file_always_conflict() {
        let scripts = batch(&[
            (
                "a.json",
                r#"[{"type": "Replace", "file": "w.cfg", "value": {"old": "Pistol", "new": "Revolver"}}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
        ]);

        let conflicts = detect_conflicts(&scripts);
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert!(c.is_replace_conflict);
        assert!(c.path.is_none());
        assert!(c.value1.is_none() && c.value2.is_none());
    }

    #[test]
    fn inherited_file_context_feeds_grouping() {
        // Second action in a.json inherits w.cfg and clashes with b.json
        let scripts = batch(&[
            (
                "a.json",
                r#"[
                    {"type": "Modify", "file": "w.cfg", "path": "Weapon::Range", "value": 100},
                    {"type": "Modify", "path": "Weapon::Damage", "value": 25}
                ]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 30}]"#,
            ),
        ]);
        assert_eq!(detect_conflicts(&scripts).len(), 1);
    }

    #[test]
    fn last_write_wins_within_one_script() {
        // a.json ends up agreeing with b.json after its second write
        let scripts = batch(&[
            (
                "a.json",
                r#"[
                    {"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 10},
                    {"type": "Modify", "path": "Weapon::Damage", "value": 30}
                ]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 30}]"#,
            ),
        ]);
        assert!(detect_conflicts(&scripts).is_empty());
    }

    #[test]
    fn detection_is_symmetric_in_outcome() {
        let forward = batch(&[
            (
                "a.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
            (
                "b.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 30}]"#,
            ),
        ]);
        // Same scripts registered under reversed names
        let reversed = batch(&[
            (
                "b.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 25}]"#,
            ),
            (
                "a.json",
                r#"[{"type": "Modify", "file": "w.cfg", "path": "Weapon::Damage", "value": 30}]"#,
            ),
        ]);

        let f = detect_conflicts(&forward);
        let r = detect_conflicts(&reversed);
        assert_eq!(f.len(), 1);
        assert_eq!(r.len(), 1);
        assert_eq!(f[0].config_file, r[0].config_file);
        assert_eq!(f[0].path, r[0].path);
    }

    #[test]
    fn add_struct_payloads_compare_element_wise() {
        let same = r#"[{"type": "AddStruct", "file": "w.cfg", "path": "Items",
                        "structures": [{"Name": "Knife"}]}]"#;
        let scripts = batch(&[("a.json", same), ("b.json", same)]);
        assert!(detect_conflicts(&scripts).is_empty());

        let other = r#"[{"type": "AddStruct", "file": "w.cfg", "path": "Items",
                         "structures": [{"Name": "Knife"}, {"Name": "Torch"}]}]"#;
        let scripts = batch(&[("a.json", same), ("b.json", other)]);
        assert_eq!(detect_conflicts(&scripts).len(), 1);
    }
}
