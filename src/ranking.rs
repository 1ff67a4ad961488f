//! Ranking of suggested diagnoses and procedures.
//!
//! Candidates are shown highest probability first. The principal-diagnosis
//! list starts collapsed to its top entry and can be expanded.

use std::cmp::Ordering;

use crate::domain::{Diagnosis, DiagnosisCode, Procedure};

/// Anything with an optional model probability
pub trait Scored {
    fn probability(&self) -> Option<f64>;
}

impl Scored for Diagnosis {
    fn probability(&self) -> Option<f64> {
        self.probability
    }
}

impl Scored for Procedure {
    fn probability(&self) -> Option<f64> {
        self.probability
    }
}

impl Scored for DiagnosisCode {
    fn probability(&self) -> Option<f64> {
        self.confidence
    }
}

impl<T: Scored> Scored for &T {
    fn probability(&self) -> Option<f64> {
        (*self).probability()
    }
}

/// Sort key: missing and NaN count as 0, anything else as given
pub fn score<T: Scored>(item: &T) -> f64 {
    match item.probability() {
        Some(p) if !p.is_nan() => p,
        _ => 0.0,
    }
}

/// Rank by descending probability
///
/// Stable: entries with equal probability keep their input order.
/// The input slice is left untouched.
pub fn rank<T: Scored>(items: &[T]) -> Vec<&T> {
    let mut ranked: Vec<&T> = items.iter().collect();
    ranked.sort_by(|a, b| score(*b).partial_cmp(&score(*a)).unwrap_or(Ordering::Equal));
    ranked
}

/// Ranked projection with collapse/expand state
#[derive(Debug, Clone)]
pub struct RankedList<'a, T> {
    ranked: Vec<&'a T>,
    collapsible: bool,
    expanded: bool,
}

impl<'a, T: Scored> RankedList<'a, T> {
    /// Create a collapsed list
    pub fn new(items: &'a [T], collapsible: bool) -> Self {
        Self {
            ranked: rank(items),
            collapsible,
            expanded: false,
        }
    }

    /// Set the expanded flag (UI state owned by the caller)
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }
}

impl<'a, T> RankedList<'a, T> {
    /// Entries currently shown
    pub fn visible(&self) -> &[&'a T] {
        if self.collapsible && !self.expanded {
            &self.ranked[..self.ranked.len().min(1)]
        } else {
            &self.ranked
        }
    }

    /// All entries in ranked order
    pub fn all(&self) -> &[&'a T] {
        &self.ranked
    }

    /// Number of entries hidden by the collapsed view
    pub fn hidden_count(&self) -> usize {
        self.ranked.len() - self.visible().len()
    }

    /// Whether an expand/collapse toggle should be offered
    pub fn has_more(&self) -> bool {
        self.collapsible && self.ranked.len() > 1
    }

    /// Top-ranked entry; the first of any tie
    pub fn principal(&self) -> Option<&'a T> {
        self.ranked.first().copied()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn toggle(&mut self) {
        self.expanded = !self.expanded;
    }

    pub fn expand(&mut self) {
        self.expanded = true;
    }

    pub fn collapse(&mut self) {
        self.expanded = false;
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    /// Toggle button text, e.g. "Show all (2)" / "Show less"
    pub fn toggle_label(&self, expand_label: &str, collapse_label: &str) -> Option<String> {
        if !self.has_more() {
            return None;
        }
        if self.expanded {
            Some(collapse_label.to_string())
        } else {
            Some(format!("{} ({})", expand_label, self.ranked.len() - 1))
        }
    }
}

/// Move a diagnosis to the principal position
///
/// The target is spliced out and reinserted at index 0. Manually added
/// entries (`custom-` ids) other than the target are dropped; everything
/// else keeps its relative order. Returns `None` for an unknown id.
pub fn set_as_principal(items: &[Diagnosis], id: &str) -> Option<Vec<Diagnosis>> {
    let position = items.iter().position(|d| d.id == id)?;

    let mut reordered = Vec::with_capacity(items.len());
    reordered.push(items[position].clone());
    reordered.extend(
        items
            .iter()
            .enumerate()
            .filter(|(i, d)| *i != position && !d.is_custom())
            .map(|(_, d)| d.clone()),
    );

    Some(reordered)
}

/// Percentage label for display; clamps to [0, 1]
///
/// Missing and zero probabilities are not shown.
pub fn format_probability(probability: Option<f64>) -> Option<String> {
    match probability {
        Some(p) if p > 0.0 => Some(format!("{:.0}%", p.min(1.0) * 100.0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(id: &str, p: Option<f64>) -> Diagnosis {
        let d = Diagnosis::new(id, id.to_uppercase(), id);
        match p {
            Some(p) => d.with_probability(p),
            None => d,
        }
    }

    fn ids<'a>(items: &[&'a Diagnosis]) -> Vec<&'a str> {
        items.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_missing_probability_ranks_as_zero() {
        let items = vec![diag("a", None), diag("b", Some(0.1)), diag("c", Some(-0.5))];
        assert_eq!(ids(&rank(&items)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_nan_ranks_as_zero() {
        let items = vec![diag("a", Some(f64::NAN)), diag("b", Some(0.2)), diag("c", None)];
        assert_eq!(ids(&rank(&items)), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_out_of_range_sorted_as_given() {
        let items = vec![diag("a", Some(0.9)), diag("b", Some(1.7))];
        assert_eq!(ids(&rank(&items)), vec!["b", "a"]);
    }

    #[test]
    fn test_not_collapsible_shows_everything() {
        let items = vec![diag("a", Some(0.2)), diag("b", Some(0.4))];
        let list = RankedList::new(&items, false);
        assert_eq!(list.visible().len(), 2);
        assert_eq!(list.hidden_count(), 0);
        assert!(!list.has_more());
        assert!(list.toggle_label("Show all", "Show less").is_none());
    }

    #[test]
    fn test_toggle_label() {
        let items = vec![diag("a", Some(0.2)), diag("b", Some(0.4)), diag("c", None)];
        let mut list = RankedList::new(&items, true);
        assert_eq!(list.toggle_label("Show all", "Show less").as_deref(), Some("Show all (2)"));
        list.toggle();
        assert_eq!(list.toggle_label("Show all", "Show less").as_deref(), Some("Show less"));
    }

    #[test]
    fn test_empty_list() {
        let items: Vec<Diagnosis> = Vec::new();
        let list = RankedList::new(&items, true);
        assert!(list.visible().is_empty());
        assert!(list.principal().is_none());
        assert_eq!(list.hidden_count(), 0);
    }

    #[test]
    fn test_set_as_principal_unknown_id() {
        let items = vec![diag("a", None)];
        assert!(set_as_principal(&items, "zzz").is_none());
    }

    #[test]
    fn test_format_probability() {
        assert_eq!(format_probability(Some(0.92)).as_deref(), Some("92%"));
        assert_eq!(format_probability(Some(1.4)).as_deref(), Some("100%"));
        assert_eq!(format_probability(Some(0.0)), None);
        assert_eq!(format_probability(None), None);
    }
}
