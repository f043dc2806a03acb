//! Locates structures inside a raw line buffer.
//!
//! The config format has no AST; a single forward scan with an explicit
//! stack of open blocks is enough to answer both "where is this
//! structure" and "which structure encloses this leaf key".

use crate::cfg::formatter::{STRUCT_BEGIN, STRUCT_END};
use crate::cfg::path::PathComponent;

/// Inclusive line range of a located structure.
///
/// When the queried path addresses a leaf key, the span covers the
/// innermost structure enclosing that key, not the key's own line.
/// Computed fresh per lookup; the buffer mutates between lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureSpan {
    pub start: usize,
    pub end: usize,
    /// Stack depth of the matched block (1 = top level).
    pub level: usize,
}

/// Scan `lines` for the structure addressed by `target`.
///
/// Returns `None` when no block matches; the path's component count
/// must equal the nesting depth of the candidate for a match.
pub fn find_structure(lines: &[String], target: &[PathComponent]) -> Option<StructureSpan> {
    // (line, name) per open block; names mirror the path text exactly
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut start: Option<usize> = None;
    let mut end: Option<usize> = None;
    let mut level = 0usize;

    for (line_no, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        if line.contains(STRUCT_BEGIN) {
            let name = block_name(line);
            stack.push((line_no, name));

            if stack_matches(&stack, None, target) {
                start = Some(line_no);
                level = stack.len();
            }
        } else if line == STRUCT_END {
            if !stack.is_empty() {
                if start.is_some() && stack.len() == level {
                    end = Some(line_no);
                    // Structure and bare-key targets are done at the
                    // first close of the matched block.
                    if is_structure_or_array(target) {
                        break;
                    }
                }
                stack.pop();
            }
        } else if line.contains('=') {
            let key = line.split('=').next().unwrap_or("").trim();
            if stack_matches(&stack, Some(key), target) {
                if let Some(&(open_line, _)) = stack.last() {
                    start = Some(open_line);
                    level = stack.len();
                }
            }
        }
    }

    match (start, end) {
        (Some(start), Some(end)) => Some(StructureSpan { start, end, level }),
        _ => None,
    }
}

/// Extract the block name from a `... : struct.begin` line.
///
/// Array elements keep their bracket text (`[3]`); named blocks drop
/// the marker and separating colon.
fn block_name(line: &str) -> String {
    if line.contains('[') {
        line.split(':').next().unwrap_or("").trim().to_string()
    } else {
        line.split(STRUCT_BEGIN)
            .next()
            .unwrap_or("")
            .trim()
            .trim_end_matches(':')
            .trim()
            .to_string()
    }
}

/// Compare the open-block stack (plus an optional leaf key) against the
/// target path, component-wise and case-sensitive.
fn stack_matches(stack: &[(usize, String)], leaf: Option<&str>, target: &[PathComponent]) -> bool {
    let current_len = stack.len() + usize::from(leaf.is_some());
    if current_len != target.len() {
        return false;
    }

    let current = stack.iter().map(|(_, name)| name.as_str()).chain(leaf);
    current.zip(target).all(|(cur, tgt)| cur == tgt.as_str())
}

/// True when the path addresses a structure or array element rather
/// than a leaf assignment.
fn is_structure_or_array(path: &[PathComponent]) -> bool {
    match path.last() {
        Some(last) => last.is_index() || !last.as_str().contains('='),
        None => false,
    }
}
