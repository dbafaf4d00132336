use serde::{Deserialize, Serialize};

/// Configuration for pack/segment/slice building with tunable bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Identical consecutive events merge into one pack when the gap from the
    /// pack's end is at most this
    pub pack_gap_secs: i64,

    /// Segment bounds: a new segment starts when adding the next pack would
    /// exceed any of these
    pub max_segment_lines: usize,
    pub max_segment_packs: usize,
    pub max_segment_secs: i64,

    /// Slice bounds
    pub max_slice_lines: usize,
    pub min_slice_lines: usize,
    pub slice_gap_secs: i64,

    /// Keyword counts requested from the oracle per segment and per slice
    pub segment_min_k: usize,
    pub segment_max_k: usize,
    pub slice_min_k: usize,
    pub slice_max_k: usize,

    /// Keywords kept per slice after ranking
    pub slice_keyword_limit: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            pack_gap_secs: 30,
            max_segment_lines: 600,
            max_segment_packs: 20,
            max_segment_secs: 1800,
            max_slice_lines: 120,
            min_slice_lines: 20,
            slice_gap_secs: 120,
            segment_min_k: 5,
            segment_max_k: 10,
            slice_min_k: 3,
            slice_max_k: 8,
            slice_keyword_limit: 10,
        }
    }
}
