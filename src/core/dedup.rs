use std::collections::HashSet;

/// Exact, case-sensitive membership test. Kana and kanji spellings of the same word
/// are different keys.
pub fn is_duplicate(key: &str, existing_keys: &HashSet<String>) -> bool {
    existing_keys.contains(key)
}

/// Keys known at the start of an import pass plus the keys emitted during it.
///
/// The host snapshot is never modified; new keys go into a separate set.
#[derive(Debug)]
pub struct KnownKeys<'a> {
    existing: &'a HashSet<String>,
    emitted: HashSet<String>,
}

impl<'a> KnownKeys<'a> {
    pub fn new(existing: &'a HashSet<String>) -> Self {
        Self { existing, emitted: HashSet::new() }
    }

    pub fn contains(&self, key: &str) -> bool {
        is_duplicate(key, self.existing) || is_duplicate(key, &self.emitted)
    }

    /// Returns false when the key was already known.
    pub fn claim(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return false;
        }
        self.emitted.insert(key.to_string());
        true
    }

    /// Forget a key claimed in this pass, e.g. after its write was refused.
    /// Keys from the host snapshot stay known.
    pub fn release(&mut self, key: &str) {
        self.emitted.remove(key);
    }
}
