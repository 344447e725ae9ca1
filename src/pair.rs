//! Canonical unordered pair of class IDs, the key of the coupling map

use std::fmt;

/// Two class IDs stored in lexical order, so `ClassPair::new(a, b) == ClassPair::new(b, a)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassPair {
    class1: String,
    class2: String,
}

impl ClassPair {
    pub fn new(a: &str, b: &str) -> Self {
        let (class1, class2) = if a <= b { (a, b) } else { (b, a) };
        ClassPair {
            class1: class1.to_string(),
            class2: class2.to_string(),
        }
    }

    /// Lexically smaller class ID
    pub fn class1(&self) -> &str {
        &self.class1
    }

    /// Lexically larger class ID
    pub fn class2(&self) -> &str {
        &self.class2
    }

    /// True if either class is `class_id`
    pub fn contains(&self, class_id: &str) -> bool {
        self.class1 == class_id || self.class2 == class_id
    }

    /// Parse a pair from a tab-delimited report line, taking the class IDs
    /// from columns `col1` and `col2`.
    pub fn from_columns(line: &str, col1: usize, col2: usize) -> Option<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        let a = fields.get(col1)?.trim();
        let b = fields.get(col2)?.trim();
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some(ClassPair::new(a, b))
    }
}

impl fmt::Display for ClassPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.class1, self.class2)
    }
}
