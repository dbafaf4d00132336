use chrono::{DateTime, Utc};

use crate::cleaner::{clean_title, clean_url, extract_domain};
use crate::models::{EventType, RawEvent};
use crate::segmentation::config::SegmentationConfig;

/// (source, channel, tag): event type, host or app, cleaned title.
pub type SliceKey = (String, String, String);

pub fn slice_key(event: &RawEvent) -> SliceKey {
    let source = event.event_type.as_str().to_string();
    let tag = clean_title(&event.title);
    let channel = match event.event_type {
        EventType::Web => extract_domain(&clean_url(&event.url)),
        _ => {
            let app = clean_title(&event.app);
            if app.is_empty() {
                "unknown".to_string()
            } else {
                app
            }
        }
    };
    (source, channel, tag)
}

/// A topic-coherent run of events inside one segment.
#[derive(Debug, Clone)]
pub struct Slice<'a> {
    pub id: String,
    pub source: String,
    pub channel: String,
    pub tag: String,
    pub events: Vec<&'a RawEvent>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub line_count: usize,
}

impl<'a> Slice<'a> {
    fn key_matches(&self, key: &SliceKey) -> bool {
        self.source == key.0 && self.channel == key.1 && self.tag == key.2
    }

    fn absorb(&mut self, other: Slice<'a>) {
        self.events.extend(other.events);
        self.end = self.end.max(other.end);
        self.line_count += other.line_count;
    }
}

fn split_raw<'a>(events: &[&'a RawEvent], config: &SegmentationConfig) -> Vec<Slice<'a>> {
    let mut slices: Vec<Slice<'a>> = Vec::new();
    let mut current: Option<Slice<'a>> = None;

    for &event in events {
        let key = slice_key(event);
        let start = event.timestamp;
        let end = event.end();

        if let Some(slice) = current.as_mut() {
            let gap = (start - slice.end).num_seconds();
            if slice.key_matches(&key)
                && gap <= config.slice_gap_secs
                && slice.line_count < config.max_slice_lines
            {
                slice.events.push(event);
                slice.end = slice.end.max(end);
                slice.line_count += 1;
                continue;
            }
        }

        if let Some(done) = current.take() {
            slices.push(done);
        }
        let (source, channel, tag) = key;
        current = Some(Slice {
            id: format!("S-{:03}", slices.len() + 1),
            source,
            channel,
            tag,
            events: vec![event],
            start,
            end,
            line_count: 1,
        });
    }

    if let Some(slice) = current {
        slices.push(slice);
    }
    slices
}

/// One left-to-right pass: a slice under `min_slice_lines` joins the last
/// accepted slice, or, before any slice is accepted, carries forward into
/// the next raw slice and is re-checked there.
fn backfill_small<'a>(raw: Vec<Slice<'a>>, min_lines: usize) -> Vec<Slice<'a>> {
    let mut accepted: Vec<Slice<'a>> = Vec::new();
    let mut carry: Option<Slice<'a>> = None;

    for next in raw {
        let slice = match carry.take() {
            Some(mut small) => {
                small.absorb(next);
                small
            }
            None => next,
        };

        if slice.line_count >= min_lines {
            accepted.push(slice);
        } else if let Some(prev) = accepted.last_mut() {
            prev.absorb(slice);
        } else {
            carry = Some(slice);
        }
    }

    if let Some(small) = carry {
        accepted.push(small);
    }
    accepted
}

/// Split a segment's events into slices, then fold undersized slices into
/// their neighbours.
pub fn build_slices<'a>(events: &[&'a RawEvent], config: &SegmentationConfig) -> Vec<Slice<'a>> {
    let raw = split_raw(events, config);
    backfill_small(raw, config.min_slice_lines)
}
