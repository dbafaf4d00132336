//! Evidence auditing: baseline tokens, evidence features, consistency,
//! thresholds, and the auditor that ties them together.

pub mod auditor;
pub mod baseline;
pub mod consistency;
pub mod evidence;
pub mod thresholds;

pub use auditor::{annotate_keywords, AuditOptions, Auditor};
pub use baseline::{build_baseline, build_baseline_with_weight, compute_overlap, tokenize};
pub use consistency::compute_consistency;
pub use evidence::{build_title_entries, compute_evidence_features, score_evidence, TitleEntry};
pub use thresholds::{assign_level, bucket_score, compute_thresholds, Bucket, Thresholds};
