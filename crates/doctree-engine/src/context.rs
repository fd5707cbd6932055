use std::collections::HashMap;

use crate::references::ReferenceTable;

/// Mutable state of one compile call: a read cursor per node path and the
/// table of touched paths.
#[derive(Debug, Default)]
pub struct CompilationContext {
    cursors: HashMap<String, usize>,
    references: ReferenceTable,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor of `path`, rewound to 0 first when `reset` is set.
    pub fn open_cursor(&mut self, path: &str, reset: bool) -> usize {
        let cursor = self.cursors.entry(path.to_string()).or_insert(0);
        if reset {
            *cursor = 0;
        }
        *cursor
    }

    pub fn advance(&mut self, path: &str) {
        *self.cursors.entry(path.to_string()).or_insert(0) += 1;
    }

    pub fn touch(&mut self, path: &str) {
        self.references.touch(path);
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn into_references(self) -> ReferenceTable {
        self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_continue_unless_reset() {
        let mut ctx = CompilationContext::new();
        assert_eq!(ctx.open_cursor("a", false), 0);
        ctx.advance("a");
        ctx.advance("a");
        assert_eq!(ctx.open_cursor("a", false), 2);
        assert_eq!(ctx.open_cursor("a", true), 0);
        assert_eq!(ctx.open_cursor("b", false), 0);
    }

    #[test]
    fn touching_twice_keeps_the_first_code() {
        let mut ctx = CompilationContext::new();
        ctx.touch("a");
        ctx.touch("b");
        ctx.touch("a");
        assert_eq!(ctx.references().len(), 2);
        assert_eq!(ctx.references().code("b"), Some("e00002v"));
    }
}
