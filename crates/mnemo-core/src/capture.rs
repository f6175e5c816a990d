//! ============================================================================
//! Auto-Capture - Opportunistic persistence of user messages
//! ============================================================================
//! Inbound user messages become project-scope memories when they pass the
//! eligibility gate. Submission is a detached task: the chat flow never
//! waits on it, and failures are logged and dropped.
//! ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::config::{MAX_MESSAGE_LENGTH, MIN_CAPTURE_LENGTH};
use crate::scrub::{fully_redacted, scrub};
use crate::service::MemoryService;
use crate::types::MemoryScope;

/// Gate an inbound message for persistence. The length cap applies to the
/// original text; the minimum-meaningful check applies after scrubbing.
/// Returns the scrubbed text when the message qualifies.
pub fn capture_eligible(text: &str) -> Option<String> {
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return None;
    }

    let scrubbed = scrub(text);
    if fully_redacted(&scrubbed) {
        return None;
    }
    if scrubbed.trim().chars().count() <= MIN_CAPTURE_LENGTH {
        return None;
    }

    Some(scrubbed)
}

/// Submit scrubbed text as a project memory on a detached task. Errors are
/// logged and dropped; nothing is awaited by the caller.
pub fn spawn_capture(service: Arc<MemoryService>, scrubbed: String) {
    tokio::spawn(async move {
        let outcome = service.add(&scrubbed, MemoryScope::Project).await;
        if !outcome.ok {
            debug!(
                "Auto-capture dropped: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    });
}
