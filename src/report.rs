//! Diff rendering for patched config files.

use similar::TextDiff;

/// Unified diff between a file's pristine and patched contents, or
/// `None` when nothing changed.
pub fn unified_diff(name: &str, original: &str, patched: &str) -> Option<String> {
    if original == patched {
        return None;
    }

    let diff = TextDiff::from_lines(original, patched);
    let mut unified = diff.unified_diff();
    unified
        .context_radius(3)
        .header(&format!("a/{name}"), &format!("b/{name}"));
    Some(unified.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_changed_lines() {
        let original = "Weapon : struct.begin\n   Damage = 10\nstruct.end\n";
        let patched = "Weapon : struct.begin\n   Damage = 25\nstruct.end\n";

        let diff = unified_diff("Weapons.cfg", original, patched).unwrap();
        assert!(diff.contains("a/Weapons.cfg"));
        assert!(diff.contains("-   Damage = 10"));
        assert!(diff.contains("+   Damage = 25"));
    }

    #[test]
    fn identical_contents_yield_no_diff() {
        let text = "Weapon : struct.begin\nstruct.end\n";
        assert!(unified_diff("Weapons.cfg", text, text).is_none());
    }
}
