//! Match Refiners (`spec.md` §4.8): pluggable fuzzy pairing for items the
//! anchor pass left unmatched — most commonly a renamed method whose
//! signature no longer compares equal but whose name and parameter list
//! are still close enough to call "the same method".

use std::collections::HashSet;

use crate::analysis::TopLevelItem;
use crate::node::NodeKind;

/// A candidate pairing between an unanchored template item and an
/// unanchored destination item, with its similarity score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedMatch {
    pub template_index: usize,
    pub destination_index: usize,
    pub similarity: f64,
}

/// A pluggable fuzzy matcher (`spec.md` §6, `match_refiners` option).
/// Refiners only ever see items the anchor pass and earlier refiners left
/// unmatched, and must return pairs independently scored in `[0, 1]`; the
/// caller applies the threshold and the greedy consumption order.
pub trait MatchRefiner {
    /// Score every template/destination pair this refiner is willing to
    /// consider; pairs it has no opinion on should simply be omitted.
    fn candidates(&self, template: &[(usize, &TopLevelItem)], destination: &[(usize, &TopLevelItem)]) -> Vec<RefinedMatch>;

    fn threshold(&self) -> f64;
}

/// Matches renamed `Method` nodes by a weighted blend of name similarity
/// (Levenshtein-based) and parameter-set similarity (itself a blend of
/// Jaccard overlap and parameter-count ratio), per `spec.md` §4.8:
/// `name_weight = 0.7`, `params_weight = 0.3`, `threshold = 0.5`.
pub struct MethodMatchRefiner {
    pub name_weight: f64,
    pub params_weight: f64,
    pub threshold: f64,
}

impl Default for MethodMatchRefiner {
    fn default() -> Self {
        Self { name_weight: 0.7, params_weight: 0.3, threshold: 0.5 }
    }
}

impl MatchRefiner for MethodMatchRefiner {
    fn candidates(&self, template: &[(usize, &TopLevelItem)], destination: &[(usize, &TopLevelItem)]) -> Vec<RefinedMatch> {
        let tmpl_methods: Vec<(usize, &str, &[String])> = template
            .iter()
            .filter_map(|(idx, item)| method_fields(item).map(|(n, p)| (*idx, n, p)))
            .collect();
        let dest_methods: Vec<(usize, &str, &[String])> = destination
            .iter()
            .filter_map(|(idx, item)| method_fields(item).map(|(n, p)| (*idx, n, p)))
            .collect();

        let mut candidates = Vec::new();
        for &(ti, tname, tparams) in &tmpl_methods {
            for &(di, dname, dparams) in &dest_methods {
                let name_sim = name_similarity(tname, dname);
                let params_sim = param_set_similarity(tparams, dparams);
                let similarity = self.name_weight * name_sim + self.params_weight * params_sim;
                if similarity >= self.threshold {
                    candidates.push(RefinedMatch { template_index: ti, destination_index: di, similarity });
                }
            }
        }
        candidates
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

fn method_fields(item: &TopLevelItem) -> Option<(&str, &[String])> {
    match item.as_statement().map(|n| &n.kind) {
        Some(NodeKind::Method { name, params }) => Some((name.as_str(), params.as_slice())),
        _ => None,
    }
}

/// `1 - normalized_levenshtein_distance`.
fn name_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let distance = levenshtein(a, b) as f64;
    let max_len = a.chars().count().max(b.chars().count()).max(1) as f64;
    (1.0 - distance / max_len).max(0.0)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            let deletion = row[j] + 1;
            let insertion = row[j + 1] + 1;
            let substitution = prev_diag + cost;
            prev_diag = row[j + 1];
            row[j + 1] = deletion.min(insertion).min(substitution);
        }
    }
    row[b.len()]
}

/// Parameter similarity per `spec.md` §4.8: `0.7 * set-overlap(names) +
/// 0.3 * count-ratio`. Set overlap is plain Jaccard over parameter names,
/// ignoring order; count ratio catches the case where two methods share no
/// parameter names but are otherwise clearly the same shape (or vice
/// versa: identical names but a parameter added or removed).
fn param_set_similarity(a: &[String], b: &[String]) -> f64 {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    let overlap = if set_a.is_empty() && set_b.is_empty() {
        1.0
    } else {
        let intersection = set_a.intersection(&set_b).count() as f64;
        let union = set_a.union(&set_b).count() as f64;
        if union == 0.0 { 0.0 } else { intersection / union }
    };

    let count_ratio = if a.is_empty() && b.is_empty() {
        1.0
    } else {
        a.len().min(b.len()) as f64 / a.len().max(b.len()) as f64
    };

    0.7 * overlap + 0.3 * count_ratio
}

/// Greedily consumes candidates in descending similarity order, never
/// reusing a template or destination index already matched — the
/// consumption strategy named in `spec.md` §4.8.
pub fn greedy_consume(mut candidates: Vec<RefinedMatch>) -> Vec<RefinedMatch> {
    candidates.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_template = HashSet::new();
    let mut used_destination = HashSet::new();
    let mut accepted = Vec::new();

    for candidate in candidates {
        if used_template.contains(&candidate.template_index) || used_destination.contains(&candidate.destination_index) {
            continue;
        }
        used_template.insert(candidate.template_index);
        used_destination.insert(candidate.destination_index);
        accepted.push(candidate);
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FileAnalysis;
    use crate::parser::Role;

    fn analyze(src: &str) -> FileAnalysis {
        FileAnalysis::analyze(src, Role::Template, "prism-merge", None).unwrap()
    }

    #[test]
    fn renamed_method_with_same_params_matches() {
        let t = analyze("def fetch_user(id)\nend\n");
        let d = analyze("def fetch_usr(id)\nend\n");
        let tmpl_items: Vec<(usize, &TopLevelItem)> = t.items.iter().enumerate().collect();
        let dest_items: Vec<(usize, &TopLevelItem)> = d.items.iter().enumerate().collect();
        let refiner = MethodMatchRefiner::default();
        let candidates = refiner.candidates(&tmpl_items, &dest_items);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].similarity >= refiner.threshold);
    }

    #[test]
    fn unrelated_methods_do_not_match() {
        let t = analyze("def fetch_user(id)\nend\n");
        let d = analyze("def render_widget(opts)\nend\n");
        let tmpl_items: Vec<(usize, &TopLevelItem)> = t.items.iter().enumerate().collect();
        let dest_items: Vec<(usize, &TopLevelItem)> = d.items.iter().enumerate().collect();
        let refiner = MethodMatchRefiner::default();
        assert!(refiner.candidates(&tmpl_items, &dest_items).is_empty());
    }

    #[test]
    fn greedy_consume_prefers_higher_similarity_and_avoids_reuse() {
        let candidates = vec![
            RefinedMatch { template_index: 0, destination_index: 0, similarity: 0.6 },
            RefinedMatch { template_index: 0, destination_index: 1, similarity: 0.9 },
            RefinedMatch { template_index: 1, destination_index: 0, similarity: 0.8 },
        ];
        let accepted = greedy_consume(candidates);
        assert_eq!(accepted.len(), 2);
        assert!(accepted.iter().any(|c| c.template_index == 0 && c.destination_index == 1));
        assert!(accepted.iter().any(|c| c.template_index == 1 && c.destination_index == 0));
    }

    #[test]
    fn levenshtein_distance_basic_cases() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }
}
