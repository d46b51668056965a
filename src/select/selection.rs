//! Parse Selection
//!
//! Per-parse record of which selectors currently match, one entry per
//! selection level (one dispatcher in the handler chain). Dispatchers
//! refresh their level around every event they route; downstream handlers
//! read it through a shared handle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct SelectionLevel {
    selectors: Vec<String>,
    matching: Vec<bool>,
}

/// Shared, cloneable view of the current selection state of a parse
#[derive(Debug, Clone, Default)]
pub struct ParseSelection {
    levels: Rc<RefCell<Vec<SelectionLevel>>>,
}

impl ParseSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new selection level and return its index
    pub fn subscribe_level(&self, selectors: Vec<String>) -> usize {
        let mut levels = self.levels.borrow_mut();
        let matching = vec![false; selectors.len()];
        levels.push(SelectionLevel { selectors, matching });
        levels.len() - 1
    }

    /// Replace the matching flags of `level`
    pub fn update(&self, level: usize, matching: &[bool]) {
        if let Some(entry) = self.levels.borrow_mut().get_mut(level) {
            entry.matching.clear();
            entry.matching.extend_from_slice(matching);
        }
    }

    /// Mark every selector of `level` as not matching
    pub fn clear(&self, level: usize) {
        if let Some(entry) = self.levels.borrow_mut().get_mut(level) {
            entry.matching.iter_mut().for_each(|m| *m = false);
        }
    }

    pub fn level_count(&self) -> usize {
        self.levels.borrow().len()
    }

    pub fn selectors(&self, level: usize) -> Vec<String> {
        self.levels
            .borrow()
            .get(level)
            .map(|entry| entry.selectors.clone())
            .unwrap_or_default()
    }

    /// Selectors of `level` matching the current event
    pub fn current_selection(&self, level: usize) -> Vec<String> {
        self.levels
            .borrow()
            .get(level)
            .map(|entry| {
                entry
                    .selectors
                    .iter()
                    .zip(&entry.matching)
                    .filter(|(_, m)| **m)
                    .map(|(s, _)| s.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_matching_any(&self, level: usize) -> bool {
        self.levels
            .borrow()
            .get(level)
            .is_some_and(|entry| entry.matching.iter().any(|m| *m))
    }

    /// Matching selectors across all levels, outermost level first
    pub fn matching_selectors(&self) -> Vec<String> {
        (0..self.level_count())
            .flat_map(|level| self.current_selection(level))
            .collect()
    }
}

impl fmt::Display for ParseSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels = self.levels.borrow();
        write!(f, "[")?;
        for (i, level) in levels.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "(")?;
            let mut first = true;
            for (selector, _) in level.selectors.iter().zip(&level.matching).filter(|(_, m)| **m) {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{}", selector)?;
                first = false;
            }
            write!(f, ")")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_independent() {
        let selection = ParseSelection::new();
        let outer = selection.subscribe_level(vec!["div".to_string(), "p".to_string()]);
        let inner = selection.subscribe_level(vec!["text()".to_string()]);
        assert_eq!((outer, inner), (0, 1));

        selection.update(outer, &[false, true]);
        selection.update(inner, &[true]);
        assert_eq!(selection.current_selection(outer), vec!["p"]);
        assert_eq!(selection.matching_selectors(), vec!["p", "text()"]);
        assert_eq!(selection.to_string(), "[(p), (text())]");

        selection.clear(outer);
        assert!(!selection.is_matching_any(outer));
        assert!(selection.is_matching_any(inner));
    }

    #[test]
    fn test_clones_share_state() {
        let selection = ParseSelection::new();
        let view = selection.clone();
        let level = selection.subscribe_level(vec!["a".to_string()]);
        selection.update(level, &[true]);
        assert_eq!(view.matching_selectors(), vec!["a"]);
        assert_eq!(view.selectors(level), vec!["a"]);
    }

    #[test]
    fn test_unknown_level_is_empty() {
        let selection = ParseSelection::new();
        assert!(selection.current_selection(3).is_empty());
        assert!(!selection.is_matching_any(3));
    }
}
