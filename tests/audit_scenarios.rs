use chrono::{Duration, TimeZone, Utc};
use jobinsight_lib::analysis::{annotate_keywords, AuditOptions, Auditor};
use jobinsight_lib::cleaner::compress_events;
use jobinsight_lib::models::{
    CompressedSnapshot, DomainStats, EventType, Keyword, KeywordPayload, Level, RawEvent,
    StructuredKeywords,
};

fn python_docs_snapshot() -> CompressedSnapshot {
    let mut stats = DomainStats {
        event_count: 50,
        active_seconds: 1200,
        ..DomainStats::default()
    };
    stats.title_freq.insert("Python docs".to_string(), 50);
    let mut snapshot = CompressedSnapshot::default();
    snapshot.web.insert("docs.python.org".to_string(), stats);
    snapshot
}

fn find<'a>(items: &'a [Keyword], name: &str) -> &'a Keyword {
    items
        .iter()
        .find(|k| k.name == name)
        .unwrap_or_else(|| panic!("{name} missing"))
}

#[test]
fn hallucinated_candidate_is_rejected() {
    let payload =
        KeywordPayload::Flat(vec![Keyword::named("Python"), Keyword::named("Kubernetes")]);
    let annotated = annotate_keywords(&payload, &python_docs_snapshot(), None);
    let items = annotated.flatten();

    let python = find(&items, "Python");
    let python_scores = python.scores.unwrap();
    assert!(python_scores.evidence > 0.0);
    assert_ne!(python.level, Some(Level::Reject));
    assert_eq!(python_scores.consistency, 1.0);

    let kube = find(&items, "Kubernetes");
    assert_eq!(kube.scores.unwrap().evidence, 0.0);
    assert_eq!(kube.level, Some(Level::Reject));
    assert_eq!(kube.evidence.as_ref().unwrap().support_count, 0);
}

#[test]
fn structured_shape_is_preserved_and_blank_names_dropped() {
    let payload = KeywordPayload::Structured(StructuredKeywords::new(
        vec![Keyword::named("Python"), Keyword::named("   ")],
        vec![Keyword::named("docs.python.org")],
    ));
    let annotated = annotate_keywords(&payload, &python_docs_snapshot(), None);
    let KeywordPayload::Structured(out) = annotated else {
        panic!("structured payload came back flat");
    };
    assert_eq!(out.skills().len(), 1);
    assert_eq!(out.tools().len(), 1);
    assert!(out.tools()[0].level.is_some());
}

#[test]
fn explicit_runs_lower_consistency_for_unstable_names() {
    let payload = KeywordPayload::Flat(vec![Keyword::named("Python"), Keyword::named("docs")]);
    let runs = vec![
        vec!["Python".to_string(), "docs".to_string()],
        vec!["Python".to_string()],
        vec!["Python".to_string()],
        vec!["Python".to_string()],
    ];
    let annotated = annotate_keywords(&payload, &python_docs_snapshot(), Some(&runs));
    let items = annotated.flatten();
    assert_eq!(find(&items, "Python").scores.unwrap().consistency, 1.0);
    assert_eq!(find(&items, "docs").scores.unwrap().consistency, 0.25);
    assert_ne!(find(&items, "docs").level, Some(Level::Pass));
}

#[test]
fn empty_payload_comes_back_unchanged() {
    let payload = KeywordPayload::Flat(Vec::new());
    assert_eq!(
        annotate_keywords(&payload, &python_docs_snapshot(), None),
        payload
    );
}

#[test]
fn audit_against_compressed_events() {
    let start = Utc.with_ymd_and_hms(2025, 3, 3, 14, 0, 0).unwrap();
    let mut events = Vec::new();
    for i in 0..6 {
        events.push(
            RawEvent::new(EventType::Web, start + Duration::minutes(i * 10), 600)
                .with_url("https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html")
                .with_title("What is Ownership? - The Rust Programming Language - Google Chrome"),
        );
    }
    events.push(
        RawEvent::new(EventType::Window, start, 1800)
            .with_app("Code.exe")
            .with_title("lib.rs - jobinsight - Visual Studio Code"),
    );
    let snapshot = compress_events(&events);
    assert!(!snapshot.is_empty());

    let payload = KeywordPayload::Flat(vec![
        Keyword::named("Rust"),
        Keyword::named("Ownership"),
        Keyword::named("Terraform"),
    ]);
    let auditor = Auditor::new(AuditOptions {
        baseline_limit: 20,
        ..AuditOptions::default()
    });
    let items = auditor.annotate(&payload, &snapshot, None).flatten();
    assert_eq!(find(&items, "Terraform").level, Some(Level::Reject));
    assert_ne!(find(&items, "Rust").level, Some(Level::Reject));
    assert_eq!(find(&items, "Rust").scores.unwrap().baseline_overlap, 1.0);
}
