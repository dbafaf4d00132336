use std::collections::{HashMap, HashSet};

/// Fraction of runs that mention each name. Duplicates inside one run count
/// once; an empty run list gives an empty map.
pub fn compute_consistency<S: AsRef<str>>(runs: &[Vec<S>]) -> HashMap<String, f64> {
    if runs.is_empty() {
        return HashMap::new();
    }
    let total = runs.len() as f64;
    let mut counts: HashMap<String, u32> = HashMap::new();
    for run in runs {
        let mut seen: HashSet<&str> = HashSet::new();
        for name in run.iter().map(AsRef::as_ref) {
            if name.is_empty() || !seen.insert(name) {
                continue;
            }
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(name, count)| (name, f64::from(count) / total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_run_once() {
        let runs = vec![
            vec!["Rust", "Rust", "Go"],
            vec!["Rust"],
            vec!["Python", ""],
            vec![],
        ];
        let scores = compute_consistency(&runs);
        assert_eq!(scores["Rust"], 0.5);
        assert_eq!(scores["Go"], 0.25);
        assert_eq!(scores["Python"], 0.25);
        assert!(!scores.contains_key(""));
    }

    #[test]
    fn present_in_every_run_scores_one() {
        let runs = vec![vec!["Docker".to_string()], vec!["Docker".to_string()]];
        assert_eq!(compute_consistency(&runs)["Docker"], 1.0);
    }

    #[test]
    fn no_runs_no_scores() {
        let runs: Vec<Vec<String>> = Vec::new();
        assert!(compute_consistency(&runs).is_empty());
    }
}
