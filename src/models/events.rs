use crate::models::MatchResult;
use serde::{Deserialize, Serialize};

/// Events streamed to the caller during a matching session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// Full ranked sequence after the cached lookup
    CachedBatch {
        resume_id: String,
        resume_name: String,
        target_city: String,
        search_keywords: Vec<String>,
        matches: Vec<MatchResult>,
        qualified_count: usize,
        from_database: bool,
        needs_live_acquire: bool,
    },
    Status {
        message: String,
        needed: usize,
    },
    LiveMatch {
        #[serde(rename = "match")]
        result: MatchResult,
        rank: usize,
    },
    Complete {
        message: String,
        total_qualified: usize,
        total_matches: usize,
        from_cached: usize,
        from_live: usize,
        #[serde(default)]
        warnings: Vec<String>,
    },
    Error {
        message: String,
    },
    Cancelled {
        message: String,
    },
}

impl MatchEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MatchEvent::CachedBatch { .. } => "cached_batch",
            MatchEvent::Status { .. } => "status",
            MatchEvent::LiveMatch { .. } => "live_match",
            MatchEvent::Complete { .. } => "complete",
            MatchEvent::Error { .. } => "error",
            MatchEvent::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchEvent::Complete { .. } | MatchEvent::Error { .. } | MatchEvent::Cancelled { .. }
        )
    }
}

/// Event with its per-session sequence number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub event: MatchEvent,
}

impl SessionEvent {
    /// Render as a server-sent-events frame
    pub fn to_sse_frame(&self) -> Result<String, serde_json::Error> {
        let data = serde_json::to_string(&self.event)?;
        Ok(format!(
            "id: {}\nevent: {}\ndata: {}\n\n",
            self.seq,
            self.event.event_type(),
            data
        ))
    }
}
