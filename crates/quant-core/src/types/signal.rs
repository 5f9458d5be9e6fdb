//! Entry/exit signal sequences.

use serde::{Deserialize, Serialize};

/// Boolean entry and exit sequences, index-aligned with a price series.
///
/// An index where both `entries[i]` and `exits[i]` are set is a conflict.
/// The exit wins: [`SignalPair::resolve_conflicts`] clears the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPair {
    pub entries: Vec<bool>,
    pub exits: Vec<bool>,
}

impl SignalPair {
    pub fn new(entries: Vec<bool>, exits: Vec<bool>) -> Self {
        Self { entries, exits }
    }

    /// All-false signals for `len` bars.
    pub fn empty(len: usize) -> Self {
        Self {
            entries: vec![false; len],
            exits: vec![false; len],
        }
    }

    /// Whether both sequences have exactly `len` elements.
    pub fn is_aligned_with(&self, len: usize) -> bool {
        self.entries.len() == len && self.exits.len() == len
    }

    /// Whether an entry and an exit are both set at `index`.
    pub fn conflicts_at(&self, index: usize) -> bool {
        matches!(
            (self.entries.get(index), self.exits.get(index)),
            (Some(true), Some(true))
        )
    }

    /// Apply the exit-wins tie-break in place. Returns the number of entries cleared.
    pub fn resolve_conflicts(&mut self) -> usize {
        let mut cleared = 0;
        for (entry, exit) in self.entries.iter_mut().zip(self.exits.iter()) {
            if *entry && *exit {
                *entry = false;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn entry_count(&self) -> usize {
        self.entries.iter().filter(|&&e| e).count()
    }

    pub fn exit_count(&self) -> usize {
        self.exits.iter().filter(|&&e| e).count()
    }

    /// Index of the first entry signal.
    pub fn first_entry(&self) -> Option<usize> {
        self.entries.iter().position(|&e| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_conflicts_exit_wins() {
        let mut signals = SignalPair::new(
            vec![true, false, true, true],
            vec![false, true, true, false],
        );
        assert!(signals.conflicts_at(2));
        assert_eq!(signals.resolve_conflicts(), 1);
        assert_eq!(signals.entries, vec![true, false, false, true]);
        assert_eq!(signals.exits, vec![false, true, true, false]);
        assert!(!signals.conflicts_at(2));
    }

    #[test]
    fn test_alignment() {
        let signals = SignalPair::empty(5);
        assert!(signals.is_aligned_with(5));
        assert!(!signals.is_aligned_with(4));

        let ragged = SignalPair::new(vec![false; 5], vec![false; 4]);
        assert!(!ragged.is_aligned_with(5));
    }

    #[test]
    fn test_counts() {
        let signals = SignalPair::new(vec![false, true, false, true], vec![true, false, false, false]);
        assert_eq!(signals.entry_count(), 2);
        assert_eq!(signals.exit_count(), 1);
        assert_eq!(signals.first_entry(), Some(1));
    }
}
