pub mod algorithm;
pub mod config;
pub mod slices;
pub mod summary;

pub use algorithm::{build_packs, build_segments, event_signature, segment_events, Pack, Segment};
pub use config::SegmentationConfig;
pub use slices::{build_slices, slice_key, Slice};
pub use summary::{format_event_line, summarize_segment, SegmentSummary};
