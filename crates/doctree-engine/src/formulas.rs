//! Path-like tokens referenced by formula text.

use std::collections::HashSet;
use std::sync::OnceLock;

use doctree_catalog::{formula_specs, FormulaGroup};
use regex::Regex;

const PATH_TOKEN: &str = r"[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z0-9_.]+[A-Za-z0-9_]";

fn path_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PATH_TOKEN).unwrap())
}

/// Dotted tokens in `text`, in order of appearance.
pub fn path_tokens(text: &str) -> Vec<&str> {
    path_token().find_iter(text).map(|m| m.as_str()).collect()
}

/// Unique dotted tokens across every well-formed formula, first seen first.
pub fn formula_paths(groups: &[FormulaGroup]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for spec in formula_specs(groups) {
        for token in path_tokens(spec.expression) {
            if seen.insert(token) {
                out.push(token.to_string());
            }
        }
    }
    out
}
