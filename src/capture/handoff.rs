use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Photo => "jpg",
            MediaType::Video => "mp4",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub uri: String,
    pub media_type: MediaType,
    pub timestamp: DateTime<Utc>,
}

/// Single-slot mailbox between the capture screen and the screen that
/// asked for the capture. Latest capture wins; reads clear the slot.
#[derive(Debug, Default)]
pub struct CaptureHandoff {
    slot: Mutex<Option<CaptureResult>>,
}

impl CaptureHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<CaptureResult>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_result(&self, media: CaptureResult) {
        if let Some(previous) = self.slot().replace(media) {
            debug!("discarding unconsumed capture {}", previous.uri);
        }
    }

    /// Takes the pending capture, leaving the slot empty.
    pub fn consume_result(&self) -> Option<CaptureResult> {
        self.slot().take()
    }

    pub fn clear(&self) {
        self.slot().take();
    }

    pub fn peek(&self) -> Option<CaptureResult> {
        self.slot().clone()
    }

    pub fn has_pending(&self) -> bool {
        self.slot().is_some()
    }
}
