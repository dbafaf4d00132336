//! Event compression: raw activity events in, [`CompressedSnapshot`] out.

pub mod intervals;
pub mod rules;
pub mod title;

use std::collections::BTreeMap;

use log::debug;

use crate::models::{
    AudioSample, CompressedSnapshot, DomainStats, EventType, NonWebSamples, RawEvent,
    SnapshotMeta, WindowSample,
};

pub use intervals::union_seconds;
pub use rules::AiDomainRule;
pub use title::{clean_title, clean_url, extract_domain};

use rules::{
    is_low_value_title, is_noise_app, is_noise_title, AUDIO_TOP_N, MIN_EVENT_SECONDS,
    TITLE_SAMPLE_CAP, WINDOW_TITLE_CAP,
};

#[derive(Default)]
struct WindowGroup {
    duration: i64,
    titles: Vec<String>,
}

/// Stateless apart from the configurable assistant-domain rule.
#[derive(Debug, Clone, Default)]
pub struct EventCompressor {
    ai_rule: AiDomainRule,
}

impl EventCompressor {
    pub fn new(ai_rule: AiDomainRule) -> Self {
        Self { ai_rule }
    }

    pub fn compress(&self, events: &[RawEvent]) -> CompressedSnapshot {
        let mut web: BTreeMap<String, DomainStats> = BTreeMap::new();
        let mut windows: BTreeMap<String, WindowGroup> = BTreeMap::new();
        let mut audio: BTreeMap<(String, String), i64> = BTreeMap::new();
        let mut total_intervals = Vec::new();
        let mut afk_intervals = Vec::new();

        for event in events {
            let duration = event.duration_secs;
            if duration <= 0 {
                continue;
            }
            let span = (event.timestamp, event.end());
            total_intervals.push(span);

            match event.event_type {
                EventType::Afk => {
                    if event.is_afk() {
                        afk_intervals.push(span);
                    }
                }
                EventType::Web => {
                    let domain = extract_domain(&clean_url(&event.url));
                    let title = if self.ai_rule.matches(&domain) {
                        AiDomainRule::masked_title(&domain)
                    } else {
                        clean_title(&event.title)
                    };

                    let stats = web.entry(domain).or_default();
                    stats.event_count += 1;
                    stats.active_seconds = stats.active_seconds.saturating_add(duration);
                    if !title.is_empty()
                        && stats.title_samples.len() < TITLE_SAMPLE_CAP
                        && !stats.title_samples.contains(&title)
                    {
                        stats.title_samples.push(title.clone());
                    }
                    *stats.title_freq.entry(title).or_insert(0) += 1;
                }
                EventType::Window => {
                    if duration < MIN_EVENT_SECONDS {
                        continue;
                    }
                    let title = clean_title(&event.title);
                    let app = clean_title(&event.app);
                    if is_noise_app(&app) || is_noise_title(&title) {
                        continue;
                    }
                    let group = windows.entry(app).or_default();
                    group.duration = group.duration.saturating_add(duration);
                    if group.titles.len() < WINDOW_TITLE_CAP
                        && !is_low_value_title(&title)
                        && !group.titles.contains(&title)
                    {
                        group.titles.push(title);
                    }
                }
                EventType::Audio => {
                    if duration < MIN_EVENT_SECONDS {
                        continue;
                    }
                    let title = clean_title(&event.title);
                    let app = clean_title(&event.app);
                    if is_noise_app(&app) || is_noise_title(&title) {
                        continue;
                    }
                    let total = audio.entry((app, title)).or_insert(0);
                    *total = total.saturating_add(duration);
                }
            }
        }

        let mut window_samples: Vec<WindowSample> = windows
            .into_iter()
            .filter(|(app, group)| !app.is_empty() || !group.titles.is_empty())
            .map(|(app, group)| WindowSample {
                app,
                duration: group.duration,
                titles: group.titles,
            })
            .collect();
        window_samples.sort_by(|a, b| b.duration.cmp(&a.duration).then_with(|| a.app.cmp(&b.app)));

        let mut audio_samples: Vec<AudioSample> = audio
            .into_iter()
            .filter(|((app, title), _)| !app.is_empty() || !title.is_empty())
            .map(|((app, title), duration)| AudioSample { app, title, duration })
            .collect();
        audio_samples.sort_by(|a, b| {
            b.duration
                .cmp(&a.duration)
                .then_with(|| a.app.cmp(&b.app))
                .then_with(|| a.title.cmp(&b.title))
        });
        audio_samples.truncate(AUDIO_TOP_N);

        let total_seconds = union_seconds(total_intervals);
        let afk_seconds = union_seconds(afk_intervals);
        let afk_ratio = if total_seconds > 0 {
            round4(afk_seconds as f64 / total_seconds as f64)
        } else {
            0.0
        };

        debug!(
            "compressed {} events into {} domains, {} window apps, {} audio samples",
            events.len(),
            web.len(),
            window_samples.len(),
            audio_samples.len()
        );

        CompressedSnapshot {
            meta: SnapshotMeta {
                total_seconds,
                afk_seconds,
                afk_ratio,
            },
            web,
            non_web_samples: NonWebSamples {
                window: window_samples,
                audio: audio_samples,
            },
            chat_sessions: Vec::new(),
        }
    }
}

/// Compress with the default assistant-domain rule.
pub fn compress_events(events: &[RawEvent]) -> CompressedSnapshot {
    EventCompressor::default().compress(events)
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
