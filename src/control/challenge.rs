//! Challenge window: a short, human-initiated override of the last decision.
//!
//! After every cycle the controller records the decision together with the
//! frame it was made on.  For `challenge_window_ms` afterwards an operator
//! may flag it as wrong; the frame is then packaged into an
//! [`UploadTicket`] for later review.  Each capture can be challenged once:
//! duplicates are detected by SHA-256 of the pixel data.

use core::fmt;

use log::{debug, info};
use uuid::Uuid;

use crate::control::gate::SortDecision;
use crate::error::ChallengeError;
use crate::frame::{ContentHash, Frame};

/// Everything the review queue needs for one challenged capture.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTicket {
    pub image: Frame,
    /// The category the bin *decided*, i.e. what is being disputed.
    pub category_name: String,
    pub generated_id: Uuid,
}

impl fmt::Display for UploadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category_name, self.generated_id)
    }
}

struct Recorded {
    decision: SortDecision,
    frame: Frame,
    hash: ContentHash,
}

pub struct ChallengeWindow {
    window_ms: u64,
    last: Option<Recorded>,
    last_challenged: Option<ContentHash>,
}

impl ChallengeWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            last: None,
            last_challenged: None,
        }
    }

    /// Make `decision` (made on `frame`) the one a challenge refers to.
    pub fn record(&mut self, decision: SortDecision, frame: Frame) {
        debug!(
            "Challenge window opened for '{}' at {}ms",
            decision.category_name, decision.decided_at_ms
        );
        let hash = frame.content_hash();
        self.last = Some(Recorded {
            decision,
            frame,
            hash,
        });
    }

    pub fn last_decision(&self) -> Option<&SortDecision> {
        self.last.as_ref().map(|r| &r.decision)
    }

    /// Challenge the recorded decision.
    ///
    /// `Expired` when `now_ms - decided_at > window`; `AlreadyChallenged`
    /// when this capture's content was the last one challenged.
    pub fn challenge(&mut self, now_ms: u64) -> Result<UploadTicket, ChallengeError> {
        let rec = self.last.as_ref().ok_or(ChallengeError::NoDecision)?;

        if now_ms.saturating_sub(rec.decision.decided_at_ms) > self.window_ms {
            return Err(ChallengeError::Expired);
        }
        if self.last_challenged == Some(rec.hash) {
            return Err(ChallengeError::AlreadyChallenged);
        }

        let ticket = UploadTicket {
            image: rec.frame.clone(),
            category_name: rec.decision.category_name.clone(),
            generated_id: Uuid::new_v4(),
        };
        self.last_challenged = Some(rec.hash);
        info!("Classification challenged: {}", ticket);
        Ok(ticket)
    }

    /// Undo a challenge whose upload failed, so it can be retried.
    pub fn revoke(&mut self, ticket: &UploadTicket) {
        if self.last_challenged == Some(ticket.image.content_hash()) {
            debug!("Challenge {} revoked", ticket.generated_id);
            self.last_challenged = None;
        }
    }
}
