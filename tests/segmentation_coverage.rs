use std::cell::Cell;

use anyhow::{bail, Result};
use chrono::{Duration, TimeZone, Utc};
use jobinsight_lib::config::AppConfig;
use jobinsight_lib::models::{
    sort_chronologically, CompressedSnapshot, EventType, Keyword, KeywordPayload, Level, RawEvent,
};
use jobinsight_lib::oracle::KeywordOracle;
use jobinsight_lib::review::build_review;
use jobinsight_lib::segmentation::{
    build_packs, build_segments, build_slices, SegmentationConfig,
};

/// Deterministic mixed activity: bursts on a few sites and apps with
/// irregular gaps.
fn activity(len: usize, seed: u64) -> Vec<RawEvent> {
    let start = Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap();
    let sites = [
        ("https://github.com/tokio-rs/tokio", "tokio-rs/tokio - GitHub"),
        ("https://docs.rs/serde", "serde - Rust"),
        ("https://stackoverflow.com/q/1", "borrow checker error - Stack Overflow"),
    ];
    let apps = [("Code.exe", "main.rs - jobinsight"), ("WindowsTerminal.exe", "cargo")];

    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        state >> 33
    };

    let mut offset = 0i64;
    (0..len)
        .map(|_| {
            offset += (next() % 90) as i64;
            let dur = 5 + (next() % 60) as i64;
            let ts = start + Duration::seconds(offset);
            let pick = next() % 5;
            if pick < 3 {
                let (url, title) = sites[pick as usize];
                RawEvent::new(EventType::Web, ts, dur).with_url(url).with_title(title)
            } else {
                let (app, title) = apps[(pick - 3) as usize];
                RawEvent::new(EventType::Window, ts, dur).with_app(app).with_title(title)
            }
        })
        .collect()
}

fn tight_config() -> SegmentationConfig {
    SegmentationConfig {
        max_segment_lines: 40,
        max_segment_packs: 6,
        max_segment_secs: 900,
        max_slice_lines: 8,
        min_slice_lines: 3,
        ..SegmentationConfig::default()
    }
}

#[test]
fn packs_segments_and_slices_cover_every_event_once() {
    for seed in [1u64, 7, 42, 1234] {
        let mut events = activity(250, seed);
        sort_chronologically(&mut events);
        let config = tight_config();

        let packs = build_packs(&events, &config);
        let from_packs: Vec<&RawEvent> = packs.iter().flat_map(|p| p.events.iter().copied()).collect();
        assert_eq!(from_packs.len(), events.len());
        assert!(from_packs.iter().zip(&events).all(|(a, b)| std::ptr::eq(*a, b)));

        let segments = build_segments(packs, &config);
        let from_segments: Vec<&RawEvent> =
            segments.iter().flat_map(|s| s.events.iter().copied()).collect();
        assert!(from_segments.iter().zip(&events).all(|(a, b)| std::ptr::eq(*a, b)));
        assert_eq!(from_segments.len(), events.len());

        let mut from_slices: Vec<&RawEvent> = Vec::new();
        for segment in &segments {
            let slices = build_slices(&segment.events, &config);
            let lines: usize = slices.iter().map(|s| s.line_count).sum();
            assert_eq!(lines, segment.events.len());
            from_slices.extend(slices.iter().flat_map(|s| s.events.iter().copied()));
        }
        assert!(from_slices.iter().zip(&events).all(|(a, b)| std::ptr::eq(*a, b)));
        assert_eq!(from_slices.len(), events.len());
    }
}

#[test]
fn multi_pack_segments_respect_bounds() {
    let mut events = activity(400, 99);
    sort_chronologically(&mut events);
    let config = tight_config();
    let segments = build_segments(build_packs(&events, &config), &config);

    for (idx, segment) in segments.iter().enumerate() {
        assert_eq!(segment.id, format!("SEG-{:03}", idx + 1));
        assert!(segment.pack_count() <= config.max_segment_packs);
        if segment.pack_count() > 1 {
            assert!(segment.line_count <= config.max_segment_lines);
            assert!(segment.duration_secs() <= config.max_segment_secs);
        }
        assert_eq!(segment.line_count, segment.events.len());
    }
}

#[test]
fn identical_bursts_collapse_into_one_pack() {
    let start = Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap();
    let events: Vec<RawEvent> = (0..10)
        .map(|i| {
            RawEvent::new(EventType::Web, start + Duration::seconds(i * 20), 15)
                .with_url("https://docs.rs/serde")
                .with_title("serde - Rust")
        })
        .collect();
    let packs = build_packs(&events, &SegmentationConfig::default());
    assert_eq!(packs.len(), 1);
    assert_eq!(packs[0].line_count, 10);
    assert_eq!(packs[0].id, "PACK-0001");
}

#[test]
fn oversized_durations_still_partition() {
    let start = Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap();
    let events = vec![
        RawEvent::new(EventType::Web, start, 10_000_000_000_000)
            .with_url("https://docs.rs/serde")
            .with_title("serde - Rust"),
        RawEvent::new(EventType::Window, start + Duration::seconds(30), i64::MAX)
            .with_app("Code.exe")
            .with_title("main.rs - jobinsight"),
        RawEvent::new(EventType::Web, start + Duration::seconds(60), 20)
            .with_url("https://docs.rs/tokio")
            .with_title("tokio - Rust"),
    ];
    let config = tight_config();
    let segments = build_segments(build_packs(&events, &config), &config);
    let covered: usize = segments.iter().map(|s| s.events.len()).sum();
    assert_eq!(covered, events.len());
    for segment in &segments {
        let slices = build_slices(&segment.events, &config);
        let lines: usize = slices.iter().map(|s| s.line_count).sum();
        assert_eq!(lines, segment.events.len());
    }
}

/// Answers the first `succeed` calls with fixed candidates, then fails.
struct ScriptedOracle {
    names: Vec<&'static str>,
    succeed: usize,
    calls: Cell<usize>,
}

impl ScriptedOracle {
    fn new(names: Vec<&'static str>, succeed: usize) -> Self {
        Self {
            names,
            succeed,
            calls: Cell::new(0),
        }
    }
}

impl KeywordOracle for ScriptedOracle {
    fn extract_keywords(
        &self,
        _snapshot: &CompressedSnapshot,
        _min_k: usize,
        _max_k: usize,
    ) -> Result<KeywordPayload> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call >= self.succeed {
            bail!("quota exhausted");
        }
        Ok(KeywordPayload::Flat(
            self.names.iter().map(|name| Keyword::named(*name)).collect(),
        ))
    }
}

fn docs_session() -> Vec<RawEvent> {
    let start = Utc.with_ymd_and_hms(2025, 5, 12, 8, 0, 0).unwrap();
    (0..24)
        .map(|i| {
            RawEvent::new(EventType::Web, start + Duration::seconds(i * 40), 30)
                .with_url("https://docs.rs/tokio")
                .with_title(format!("tokio runtime chapter {}", i % 4))
        })
        .collect()
}

#[test]
fn slices_audit_oracle_candidates_against_their_own_events() {
    let events = docs_session();
    let mut config = AppConfig::default();
    config.segmentation.slice_keyword_limit = 1;
    let oracle = ScriptedOracle::new(vec!["tokio", "Kubernetes"], usize::MAX);

    let artifact = build_review(&events, &config, Some(&oracle));
    let slice_count: usize = artifact.segments.iter().map(|s| s.slices.len()).sum();
    assert!(slice_count > 0);
    assert_eq!(oracle.calls.get(), artifact.segments.len() + slice_count);

    for segment in &artifact.segments {
        assert_eq!(segment.llm_keywords.len(), 2);
        for slice in &segment.slices {
            assert_eq!(slice.llm_keywords.len(), 1);
            let top = &slice.llm_keywords[0];
            assert_eq!(top.name, "tokio");
            assert_ne!(top.level, Some(Level::Reject));
            assert!(top.scores.unwrap().evidence > 0.0);
        }
    }
}

#[test]
fn slices_fall_back_to_segment_candidates() {
    let events = docs_session();
    let oracle = ScriptedOracle::new(vec!["tokio", "Kubernetes"], 1);

    let artifact = build_review(&events, &AppConfig::default(), Some(&oracle));
    let first = &artifact.segments[0];
    assert_eq!(first.llm_keywords.len(), 2);
    for slice in &first.slices {
        let names: Vec<&str> = slice.llm_keywords.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["tokio", "Kubernetes"]);
        let kube = &slice.llm_keywords[1];
        assert_eq!(kube.level, Some(Level::Reject));
        assert!(!slice.baseline_keywords.is_empty());
    }
}
