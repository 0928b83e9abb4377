//! Relevance ranking for selection lists.
//!
//! The ranking is a pure function of the candidate list and the search term, so it
//! is recomputed from scratch on every keystroke.

use super::search::SearchTerm;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Maximum size of the "recently used" group.
pub const RECENT_LIMIT: usize = 5;

/// One selectable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Catalog item id
    pub id: i64,
    /// Display label in the user's locale
    pub label: String,
    /// Secondary text, searchable
    pub description: Option<String>,
    /// Pinned by the farm
    pub is_favorite: bool,
    /// How often the farm picked it
    pub usage_count: i64,
}

impl Candidate {
    fn matches(&self, search: &SearchTerm) -> bool {
        search.matches_any([
            self.label.as_str(),
            self.description.as_deref().unwrap_or_default(),
        ])
    }
}

/// Display group of a ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankGroup {
    /// Pinned items
    Favorites,
    /// Most used items
    Recent,
    /// Everything else
    Others,
}

impl RankGroup {
    /// Locale key of the group heading.
    #[must_use]
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::Favorites => "selection.group.favorites",
            Self::Recent => "selection.group.recent",
            Self::Others => "selection.group.others",
        }
    }
}

/// Candidates split into favorites, recently used and the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedCandidates {
    /// Favorites, in input order
    pub favorites: Vec<Candidate>,
    /// Most used non-favorites, at most [`RECENT_LIMIT`]
    pub recent: Vec<Candidate>,
    /// Remaining non-favorites
    pub others: Vec<Candidate>,
}

impl RankedCandidates {
    /// Non-empty groups in render order.
    #[must_use]
    pub fn groups(&self) -> Vec<(RankGroup, &[Candidate])> {
        [
            (RankGroup::Favorites, self.favorites.as_slice()),
            (RankGroup::Recent, self.recent.as_slice()),
            (RankGroup::Others, self.others.as_slice()),
        ]
        .into_iter()
        .filter(|(_, group)| !group.is_empty())
        .collect()
    }

    /// Flat render order.
    pub fn ordered(&self) -> impl Iterator<Item = &Candidate> {
        self.favorites
            .iter()
            .chain(&self.recent)
            .chain(&self.others)
    }

    /// Number of ranked candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.favorites.len() + self.recent.len() + self.others.len()
    }

    /// Whether no candidate matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Filters `candidates` by `search` and partitions them for display.
///
/// Non-favorites are ordered by usage descending with ties broken by id; the
/// first [`RECENT_LIMIT`] with a non-zero usage form the recent group.
#[must_use]
pub fn rank(candidates: &[Candidate], search: &SearchTerm) -> RankedCandidates {
    let (favorites, mut rest): (Vec<Candidate>, Vec<Candidate>) = candidates
        .iter()
        .filter(|candidate| candidate.matches(search))
        .cloned()
        .partition(|candidate| candidate.is_favorite);

    rest.sort_by_key(|candidate| (Reverse(candidate.usage_count), candidate.id));

    let recent_len = rest
        .iter()
        .take(RECENT_LIMIT)
        .take_while(|candidate| candidate.usage_count > 0)
        .count();
    let others = rest.split_off(recent_len);

    RankedCandidates {
        favorites,
        recent: rest,
        others,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, label: &str, is_favorite: bool, usage_count: i64) -> Candidate {
        Candidate {
            id,
            label: label.to_string(),
            description: None,
            is_favorite,
            usage_count,
        }
    }

    fn ids(group: &[Candidate]) -> Vec<i64> {
        group.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_favorites_then_recent_then_others() {
        let candidates = vec![
            candidate(1, "A", false, 3),
            candidate(2, "B", true, 0),
            candidate(3, "C", false, 0),
            candidate(4, "D", false, 7),
        ];

        let ranked = rank(&candidates, &SearchTerm::default());
        assert_eq!(ids(&ranked.favorites), vec![2]);
        assert_eq!(ids(&ranked.recent), vec![4, 1]);
        assert_eq!(ids(&ranked.others), vec![3]);

        let labels: Vec<&str> = ranked.ordered().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_recent_is_capped() {
        let candidates: Vec<Candidate> = (1..=9)
            .map(|id| candidate(id, &format!("item {id}"), false, id))
            .collect();

        let ranked = rank(&candidates, &SearchTerm::default());
        assert_eq!(ranked.recent.len(), RECENT_LIMIT);
        assert_eq!(ids(&ranked.recent), vec![9, 8, 7, 6, 5]);
        assert_eq!(ids(&ranked.others), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_usage_ties_break_on_id() {
        let candidates = vec![
            candidate(30, "x", false, 2),
            candidate(10, "y", false, 2),
            candidate(20, "z", false, 2),
        ];
        let first = rank(&candidates, &SearchTerm::default());
        let second = rank(&candidates, &SearchTerm::default());

        assert_eq!(ids(&first.recent), vec![10, 20, 30]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_search_filters_before_partitioning() {
        let mut with_description = candidate(5, "Oxytetracycline", false, 0);
        with_description.description = Some("Antibiotique longue action".to_string());
        let candidates = vec![
            candidate(1, "Ivermectine", true, 0),
            candidate(2, "Vitamine AD3E", false, 4),
            with_description,
        ];

        let ranked = rank(&candidates, &SearchTerm::new("ANTIBIO"));
        assert_eq!(ranked.len(), 1);
        assert_eq!(ids(&ranked.others), vec![5]);

        let ranked = rank(&candidates, &SearchTerm::new("ine"));
        assert_eq!(ids(&ranked.favorites), vec![1]);
        assert_eq!(ids(&ranked.recent), vec![2]);
        assert_eq!(ids(&ranked.others), vec![5]);

        let ranked = rank(&candidates, &SearchTerm::new("vitamine"));
        assert_eq!(ids(&ranked.recent), vec![2]);
        assert!(ranked.favorites.is_empty() && ranked.others.is_empty());
    }

    #[test]
    fn test_empty_groups_are_omitted() {
        let candidates = vec![candidate(1, "only", false, 0)];
        let ranked = rank(&candidates, &SearchTerm::default());
        let groups: Vec<RankGroup> = ranked.groups().into_iter().map(|(group, _)| group).collect();
        assert_eq!(groups, vec![RankGroup::Others]);
        assert!(rank(&[], &SearchTerm::default()).is_empty());
    }
}
