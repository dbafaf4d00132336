use jobinsight_lib::analysis::thresholds::PASS_MIN_CONSISTENCY;
use jobinsight_lib::analysis::{
    assign_level, compute_consistency, compute_evidence_features, compute_thresholds,
    score_evidence, TitleEntry,
};
use jobinsight_lib::analysis::evidence::EvidenceMaxima;
use jobinsight_lib::chat::{compress_chat_text, ChatCompression};
use jobinsight_lib::models::Level;

fn lcg(seed: u64) -> impl FnMut() -> u64 {
    let mut state = seed;
    move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        state >> 33
    }
}

#[test]
fn thresholds_are_ordered_for_any_batch() {
    let mut next = lcg(3);
    for len in 1..40 {
        let scores: Vec<f64> = (0..len).map(|_| (next() % 10_000) as f64 / 10_000.0).collect();
        let t = compute_thresholds(&scores);
        assert!(t.t0 <= t.t1, "{t:?}");
    }
}

#[test]
fn level_is_reject_exactly_below_t0() {
    let mut next = lcg(11);
    for _ in 0..500 {
        let scores: Vec<f64> = (0..7).map(|_| (next() % 1000) as f64 / 1000.0).collect();
        let t = compute_thresholds(&scores);
        for &evidence in &scores {
            let consistency = (next() % 100) as f64 / 100.0;
            let overlap = (next() % 2) as f64;
            let level = assign_level(evidence, consistency, overlap, &t);
            assert_eq!(level == Level::Reject, evidence < t.t0);
            if level == Level::Pass {
                assert!(consistency >= PASS_MIN_CONSISTENCY);
            }
        }
    }
}

#[test]
fn consistency_is_bounded_and_full_only_when_everywhere() {
    let names = ["rust", "go", "sql", "tokio"];
    let mut next = lcg(5);
    for _ in 0..100 {
        let runs: Vec<Vec<&str>> = (0..5)
            .map(|_| {
                names
                    .iter()
                    .filter(|_| next() % 3 != 0)
                    .copied()
                    .chain(std::iter::once("rust"))
                    .collect()
            })
            .collect();
        let scores = compute_consistency(&runs);
        for (name, score) in &scores {
            assert!((0.0..=1.0).contains(score));
            let everywhere = runs.iter().all(|run| run.contains(&name.as_str()));
            assert_eq!(*score == 1.0, everywhere, "{name}");
        }
        assert_eq!(scores["rust"], 1.0);
    }
}

#[test]
fn more_support_never_scores_lower() {
    let entries = vec![
        TitleEntry {
            title: "Rust async book".to_string(),
            count: 4,
            duration: 600.0,
        },
        TitleEntry {
            title: "Rust by Example".to_string(),
            count: 2,
            duration: 300.0,
        },
        TitleEntry {
            title: "Learning Go".to_string(),
            count: 1,
            duration: 120.0,
        },
    ];
    let rust = compute_evidence_features("rust", &entries);
    let go = compute_evidence_features("go", &entries);
    let maxima = EvidenceMaxima::from_features([&rust, &go]);
    assert!(rust.support_count > go.support_count);
    assert!(score_evidence(&rust, &maxima) >= score_evidence(&go, &maxima));
    assert_eq!(score_evidence(&rust, &maxima), 1.0);
}

#[test]
fn compression_never_exceeds_max_chars() {
    let samples = [
        "x".repeat(10_000),
        "same line\n".repeat(800),
        "error: failed to compile\n".repeat(300),
        "```rust\nfn main() {}\n```\n".repeat(50),
        String::new(),
        "中文内容没有换行".repeat(400),
    ];
    for max_chars in [0usize, 1, 7, 50, 200, 1000] {
        let options = ChatCompression {
            max_chars,
            ..ChatCompression::default()
        };
        for text in &samples {
            let out = compress_chat_text(text, &options);
            assert!(
                out.chars().count() <= max_chars,
                "{} chars for budget {max_chars}",
                out.chars().count()
            );
        }
    }
}
