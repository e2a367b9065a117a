use indexmap::IndexSet;

/// Owns every label in the output listing and mints suffixed variants
/// (`foo`, `foo1`, `foo2`, ...) on demand to keep them globally unique.
pub struct LabelBook {
    used: IndexSet<String>,
}

impl LabelBook {
    pub fn new() -> Self {
        LabelBook {
            used: IndexSet::new(),
        }
    }

    /// Returns `base` when it is still free, otherwise the first free
    /// numbered variant.
    pub fn unique(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

impl Default for LabelBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mints_suffixed_variants() {
        let mut book = LabelBook::new();
        assert_eq!(book.unique("foo"), "foo");
        assert_eq!(book.unique("foo"), "foo1");
        assert_eq!(book.unique("foo"), "foo2");
        assert_eq!(book.unique("bar"), "bar");
    }

    #[test]
    fn skips_taken_variants() {
        let mut book = LabelBook::new();
        assert_eq!(book.unique("foo1"), "foo1");
        assert_eq!(book.unique("foo"), "foo");
        assert_eq!(book.unique("foo"), "foo2");
    }
}
