//! Identifier normalization for path segments.

use unicode_normalization::UnicodeNormalization;

/// Map display text to a lowercase, underscore-delimited ASCII identifier.
///
/// Accents are stripped by NFKD decomposition (combining marks and any other
/// non-ASCII code point are dropped), every character outside `[A-Za-z0-9_]`
/// becomes `_`, runs of `_` collapse, and leading/trailing `_` are trimmed.
///
/// ```
/// use doctree_catalog::normalize;
///
/// assert_eq!(normalize("Medição do Contrato"), "medicao_do_contrato");
/// assert_eq!(normalize("  Qty (un.)  "), "qty_un");
/// assert_eq!(normalize(""), "");
/// ```
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_underscore = false;

    for c in text.nfkd().filter(char::is_ascii) {
        let c = if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' };
        if c == '_' {
            if prev_underscore {
                continue;
            }
            prev_underscore = true;
        } else {
            prev_underscore = false;
        }
        out.push(c);
    }

    out.trim_matches('_').to_string()
}

/// Node key: the raw name with spaces replaced by underscores.
///
/// Keys double as translation lookup keys, so they keep their original case.
pub fn node_key(name: &str) -> String {
    name.replace(' ', "_")
}
