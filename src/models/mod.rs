pub mod chat;
pub mod event;
pub mod keyword;
pub mod snapshot;

pub use chat::ChatSession;
pub use event::{sort_chronologically, EventType, RawEvent};
pub use keyword::{
    EvidenceFeatures, EvidenceType, Keyword, KeywordPayload, KeywordScores, Level,
    StructuredKeywords, SKILLS_KEY, TOOLS_KEY,
};
pub use snapshot::{
    AudioSample, CompressedSnapshot, DomainStats, NonWebSamples, SnapshotMeta, WindowSample,
};
