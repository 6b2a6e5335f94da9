//! Named counters for conflict event volumes

use std::collections::HashMap;

/// Accumulates per-name event counts (entered, left, ended).
pub struct Counter {
    counters: HashMap<String, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    pub fn increment(&mut self, name: &str, value: usize) {
        *self.counters.entry(name.to_string()).or_insert(0) += value;
    }

    pub fn get(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &usize)> {
        self.counters.iter()
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_by_name() {
        let mut counter = Counter::new();
        counter.increment("conflicts_entered", 2);
        counter.increment("conflicts_entered", 3);
        assert_eq!(counter.get("conflicts_entered"), 5);
        assert_eq!(counter.get("conflicts_left"), 0);
    }
}
