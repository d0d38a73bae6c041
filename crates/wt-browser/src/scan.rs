use std::collections::HashSet;

/// Domains already reported on during this extension lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanState {
    scanned: HashSet<String>,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every scanned domain; called on install and startup.
    pub fn reset(&mut self) {
        self.scanned.clear();
    }

    /// Marks a domain as scanned. Returns false if it already was.
    pub fn mark(&mut self, domain: &str) -> bool {
        self.scanned.insert(domain.to_owned())
    }

    pub fn len(&self) -> usize {
        self.scanned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanned.is_empty()
    }
}
