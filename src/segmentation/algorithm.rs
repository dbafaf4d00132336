use chrono::{DateTime, Utc};

use crate::cleaner::{clean_title, clean_url};
use crate::models::RawEvent;
use crate::segmentation::config::SegmentationConfig;

/// (event_type, cleaned app, cleaned url, cleaned title)
pub type EventSignature = (String, String, String, String);

pub fn event_signature(event: &RawEvent) -> EventSignature {
    (
        event.event_type.as_str().to_string(),
        clean_title(&event.app),
        clean_url(&event.url),
        clean_title(&event.title),
    )
}

/// A maximal run of identical consecutive events with small gaps.
#[derive(Debug, Clone)]
pub struct Pack<'a> {
    pub id: String,
    pub signature: EventSignature,
    pub events: Vec<&'a RawEvent>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub line_count: usize,
}

/// An ordered run of packs bounded by lines, pack count and wall time.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub id: String,
    pub packs: Vec<Pack<'a>>,
    pub events: Vec<&'a RawEvent>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub line_count: usize,
}

impl<'a> Segment<'a> {
    fn seed(id: String, pack: Pack<'a>) -> Self {
        Self {
            id,
            events: pack.events.clone(),
            start: pack.start,
            end: pack.end,
            line_count: pack.line_count,
            packs: vec![pack],
        }
    }

    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

/// Group a chronologically sorted event list into packs.
pub fn build_packs<'a>(events: &'a [RawEvent], config: &SegmentationConfig) -> Vec<Pack<'a>> {
    let mut packs = Vec::new();
    let mut current: Option<Pack<'a>> = None;

    for event in events {
        let signature = event_signature(event);
        let start = event.timestamp;
        let end = event.end();

        match &mut current {
            Some(pack)
                if pack.signature == signature
                    && (start - pack.end).num_seconds() <= config.pack_gap_secs =>
            {
                pack.events.push(event);
                pack.end = pack.end.max(end);
                pack.line_count += 1;
            }
            _ => {
                if let Some(pack) = current.take() {
                    packs.push(pack);
                }
                current = Some(Pack {
                    id: format!("PACK-{:04}", packs.len() + 1),
                    signature,
                    events: vec![event],
                    start,
                    end,
                    line_count: 1,
                });
            }
        }
    }

    if let Some(pack) = current {
        packs.push(pack);
    }

    packs
}

/// Greedily pack consecutive packs into bounded segments. An oversized pack
/// still becomes its own segment; packs are never split.
pub fn build_segments<'a>(packs: Vec<Pack<'a>>, config: &SegmentationConfig) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut current: Option<Segment<'a>> = None;

    for pack in packs {
        let Some(segment) = current.as_mut() else {
            current = Some(Segment::seed(format!("SEG-{:03}", segments.len() + 1), pack));
            continue;
        };

        let new_lines = segment.line_count + pack.line_count;
        let new_packs = segment.packs.len() + 1;
        let new_duration = (segment.end.max(pack.end) - segment.start).num_seconds();

        if new_lines > config.max_segment_lines
            || new_packs > config.max_segment_packs
            || new_duration > config.max_segment_secs
        {
            if let Some(done) = current.take() {
                segments.push(done);
            }
            current = Some(Segment::seed(format!("SEG-{:03}", segments.len() + 1), pack));
            continue;
        }

        segment.events.extend(pack.events.iter().copied());
        segment.end = segment.end.max(pack.end);
        segment.line_count = new_lines;
        segment.packs.push(pack);
    }

    if let Some(segment) = current {
        segments.push(segment);
    }

    segments
}

/// Packs then segments in one call.
pub fn segment_events<'a>(events: &'a [RawEvent], config: &SegmentationConfig) -> Vec<Segment<'a>> {
    build_segments(build_packs(events, config), config)
}
