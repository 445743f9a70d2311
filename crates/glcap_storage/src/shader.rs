//! Shader source table.

use crate::dedup::{DedupTable, Interned};

/// Deduplicated shader sources (`shaderSources[N]` in replay)
#[derive(Debug, Clone, Default)]
pub struct ShaderTable {
    table: DedupTable<String, ()>,
}

impl ShaderTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a source text
    pub fn intern(&mut self, source: &str) -> Interned {
        match self.table.slot_of(source) {
            Some(slot) => Interned {
                slot,
                is_new: false,
            },
            None => self.table.intern_with(source.to_string(), || ()),
        }
    }

    /// Sources in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.table.iter().map(|(i, k, _)| (i, k.as_str()))
    }

    /// Number of distinct sources
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Escape a source for a template literal: backslashes, backticks and `${`
#[must_use]
pub fn escape_template(source: &str) -> String {
    source
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sources_share_slot() {
        let mut table = ShaderTable::new();
        let a = table.intern("void main() {}");
        let b = table.intern("precision mediump float;");
        let c = table.intern("void main() {}");
        assert_eq!(a.slot, 0);
        assert_eq!(b.slot, 1);
        assert_eq!(c, Interned { slot: 0, is_new: false });
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_escape_template() {
        assert_eq!(escape_template("a`b"), "a\\`b");
        assert_eq!(escape_template("${x}"), "\\${x}");
        assert_eq!(escape_template("a\\nb"), "a\\\\nb");
        assert_eq!(escape_template("plain"), "plain");
    }
}
