//! Path ↔ reference code table and substitution.
//!
//! Codes are assigned densely in first-touched order (`e00001v`, `e00002v`,
//! ...). Substitution rewrites structural `path` fields by exact match and
//! formula text token-wise. A dotted token (`word(.word)*`) is atomic: a path
//! replaces it only when it spans the whole token, so `contract` never
//! rewrites the head of `contract.unit_price`. At any position longer paths
//! are tried before shorter ones.

use indexmap::IndexMap;

use crate::output::{CompiledDocument, EngineHead};

/// `e` + 1-based index zero-padded to five digits + `v`.
pub fn reference_code(index: usize) -> String {
    format!("e{index:05}v")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    by_path: IndexMap<String, String>,
    by_code: IndexMap<String, String>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Code of `path`, assigning the next one on first touch.
    pub fn touch(&mut self, path: &str) -> &str {
        if !self.by_path.contains_key(path) {
            let code = reference_code(self.by_path.len() + 1);
            self.by_code.insert(code.clone(), path.to_string());
            self.by_path.insert(path.to_string(), code);
        }
        self.by_path.get(path).map(String::as_str).unwrap_or_default()
    }

    pub fn code(&self, path: &str) -> Option<&str> {
        self.by_path.get(path).map(String::as_str)
    }

    pub fn path(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(String::as_str)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.by_path.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// `(code, path)` in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.by_code.iter().map(|(c, p)| (c.as_str(), p.as_str()))
    }

    pub fn to_code_map(&self) -> IndexMap<String, String> {
        self.by_code.clone()
    }

    /// Path → code substitution.
    pub fn forward(&self) -> Substitution<'_> {
        Substitution::new(&self.by_path)
    }
}

// ============================================================================
// Substitution
// ============================================================================

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether a match may start after `before` (nearest char last).
fn opens_token(before: &str) -> bool {
    let mut back = before.chars().rev();
    match back.next() {
        None => true,
        Some('.') => !back.next().is_some_and(is_word),
        Some(c) => !is_word(c),
    }
}

/// Whether a match may end before `after`.
fn closes_token(after: &str) -> bool {
    let mut ahead = after.chars();
    match ahead.next() {
        None => true,
        Some('.') => !ahead.next().is_some_and(is_word),
        Some(c) => !is_word(c),
    }
}

/// One direction of the table, ready to rewrite text.
#[derive(Debug, Clone)]
pub struct Substitution<'t> {
    exact: &'t IndexMap<String, String>,
    /// Longest first; equal lengths keep table order.
    ordered: Vec<(&'t str, &'t str)>,
}

impl<'t> Substitution<'t> {
    pub fn new(map: &'t IndexMap<String, String>) -> Self {
        let mut ordered: Vec<(&str, &str)> = map
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .map(|(from, to)| (from.as_str(), to.as_str()))
            .collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self { exact: map, ordered }
    }

    /// Search order: `from` values, longest first.
    pub fn order(&self) -> impl Iterator<Item = &'t str> + '_ {
        self.ordered.iter().map(|(from, _)| *from)
    }

    /// Replacement for a whole structural value; unknown values pass through.
    pub fn exact(&self, value: &str) -> String {
        self.exact
            .get(value)
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    /// Replace every whole-token occurrence in `text`, preserving delimiters.
    pub fn tokens(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;

        'scan: while let Some(c) = text[pos..].chars().next() {
            if opens_token(&text[..pos]) {
                let rest = &text[pos..];
                for (from, to) in &self.ordered {
                    if let Some(after) = rest.strip_prefix(from) {
                        if closes_token(after) {
                            out.push_str(to);
                            pos += from.len();
                            continue 'scan;
                        }
                    }
                }
            }
            out.push(c);
            pos += c.len_utf8();
        }
        out
    }

    fn rewrite(&self, heads: &mut [EngineHead]) {
        for head in heads {
            head.path = self.exact(&head.path);
            for formula in &mut head.formulas {
                formula.path = self.exact(&formula.path);
                formula.value = self.tokens(&formula.value);
            }
            for item in &mut head.data {
                for field in &mut item.fields {
                    field.path = self.exact(&field.path);
                }
                self.rewrite(&mut item.children);
            }
        }
    }
}

/// Replace every path in `heads` by its code.
pub fn compile_references(mut heads: Vec<EngineHead>, table: &ReferenceTable) -> CompiledDocument {
    table.forward().rewrite(&mut heads);
    CompiledDocument {
        references: table.to_code_map(),
        data: heads,
    }
}

impl CompiledDocument {
    /// The document with every code mapped back to its path.
    pub fn resolve(&self) -> Vec<EngineHead> {
        let mut heads = self.data.clone();
        Substitution::new(&self.references).rewrite(&mut heads);
        heads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(paths: &[&str]) -> ReferenceTable {
        let mut t = ReferenceTable::new();
        for p in paths {
            t.touch(p);
        }
        t
    }

    #[test]
    fn codes_are_dense_and_padded() {
        let mut t = table(&["contract", "contract.amount"]);
        assert_eq!(t.code("contract"), Some("e00001v"));
        assert_eq!(t.touch("contract.amount"), "e00002v");
        assert_eq!(t.touch("contract.discount"), "e00003v");
        assert_eq!(t.path("e00003v"), Some("contract.discount"));
        assert_eq!(reference_code(123456), "e123456v");
    }

    #[test]
    fn formula_operators_survive() {
        let t = table(&["contract.amount", "contract.discount"]);
        let out = t
            .forward()
            .tokens("(contract.amount - contract.discount) * 0.5");
        assert_eq!(out, "(e00001v - e00002v) * 0.5");
    }

    #[test]
    fn word_characters_block_matches() {
        let t = table(&["asset"]);
        let sub = t.forward();
        assert_eq!(sub.tokens("assetid + asset"), "assetid + e00001v");
        assert_eq!(sub.tokens("my_asset"), "my_asset");
        assert_eq!(sub.tokens("asset_2"), "asset_2");
        assert_eq!(sub.tokens("asset.x"), "asset.x");
    }

    #[test]
    fn dotted_tokens_are_replaced_whole_or_not_at_all() {
        let t = table(&["contract", "contract.amount"]);
        let sub = t.forward();
        assert_eq!(
            sub.tokens("contract.amount * contract.unit_price"),
            "e00002v * contract.unit_price"
        );
        assert_eq!(sub.tokens("x.contract + contract"), "x.contract + e00001v");
        assert_eq!(sub.tokens("contract.amount."), "e00002v.");
        assert_eq!(sub.tokens(".contract"), ".e00001v");
    }

    #[test]
    fn longer_paths_win_over_their_prefixes() {
        let t = table(&["contract.item", "contract.item.qty"]);
        let sub = t.forward();
        assert_eq!(
            sub.order().collect::<Vec<_>>(),
            ["contract.item.qty", "contract.item"]
        );
        assert_eq!(
            sub.tokens("contract.item.qty*contract.item"),
            "e00002v*e00001v"
        );
    }

    #[test]
    fn equal_lengths_keep_touch_order() {
        let t = table(&["a.bb", "a.cc", "a.d"]);
        assert_eq!(t.forward().order().collect::<Vec<_>>(), ["a.bb", "a.cc", "a.d"]);
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let t = table(&["contrato.valor"]);
        assert_eq!(
            t.forward().tokens("SE(contrato.valor>0;\"ação\";contrato.valor)"),
            "SE(e00001v>0;\"ação\";e00001v)"
        );
    }

    #[test]
    fn exact_leaves_unknown_values() {
        let t = table(&["contract"]);
        assert_eq!(t.forward().exact("contract"), "e00001v");
        assert_eq!(t.forward().exact("contract.x"), "contract.x");
    }
}
