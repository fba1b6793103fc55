use crate::env::EnvMap;

/// Captured values owned by one sequence. Setup captures are cloned in as
/// the seed; nothing else reads or writes a sequence's context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    captures: EnvMap,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.captures.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.captures.contains_key(name)
    }

    /// Stores a capture, replacing the value of an earlier run of the same
    /// hook.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.captures.insert(name.into(), value.into());
    }

    /// Drops a capture so that dependents fail instead of reusing a value
    /// from an earlier run.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.captures.remove(name)
    }

    pub fn captures(&self) -> &EnvMap {
        &self.captures
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }
}
