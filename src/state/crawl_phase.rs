//! Crawl phase definitions for the controller state machine
//!
//! The controller walks `Start -> Authenticated -> HomepageFetched ->
//! Paginating -> Done`. `Retrying` is entered from any fetch that discovers an
//! expired session and left once the session has been refreshed.

use crate::HarvestError;
use std::fmt;

/// Represents the current phase of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Nothing has happened yet
    Start,

    /// A session has been established
    Authenticated,

    /// At least one service root has been fetched and its collections enumerated
    HomepageFetched,

    /// Collection pages are being fetched
    Paginating,

    /// At least one request is waiting on a session refresh
    Retrying,

    /// No outstanding work remains
    Done,
}

impl CrawlPhase {
    /// Returns true if the machine may move from `self` to `next`
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;
        match (self, next) {
            (Start, Authenticated) => true,
            (Authenticated, HomepageFetched | Paginating | Retrying | Done) => true,
            (HomepageFetched, HomepageFetched | Paginating | Retrying | Done) => true,
            (Paginating, Paginating | Retrying | Done) => true,
            (Retrying, Authenticated | HomepageFetched | Paginating | Retrying | Done) => true,
            _ => false,
        }
    }

    /// Returns true if this is the terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Position along the main line; `Retrying` sits outside it
    fn rank(&self) -> Option<u8> {
        match self {
            Self::Start => Some(0),
            Self::Authenticated => Some(1),
            Self::HomepageFetched => Some(2),
            Self::Paginating => Some(3),
            Self::Retrying => None,
            Self::Done => Some(4),
        }
    }

    /// Short lowercase name used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Authenticated => "authenticated",
            Self::HomepageFetched => "homepage_fetched",
            Self::Paginating => "paginating",
            Self::Retrying => "retrying",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the controller phase while fetches retry concurrently
///
/// Several requests may be waiting on a refresh at once; the tracker reports
/// `Retrying` while any of them is, then falls back to the phase the crawl had
/// reached in the meantime.
#[derive(Debug)]
pub struct PhaseTracker {
    phase: CrawlPhase,
    resume_to: CrawlPhase,
    retrying: usize,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            phase: CrawlPhase::Start,
            resume_to: CrawlPhase::Start,
            retrying: 0,
        }
    }

    /// The phase as observed from outside
    pub fn current(&self) -> CrawlPhase {
        self.phase
    }

    /// Moves the underlying phase forward, validating the transition
    ///
    /// Advancing to the phase the crawl is already in is a no-op.
    pub fn advance(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        let base = self.base();
        if base == next {
            return Ok(());
        }
        if !base.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: base,
                to: next,
            });
        }

        tracing::info!(from = %base, to = %next, "Crawl phase changed");
        if self.retrying > 0 && !next.is_terminal() {
            self.resume_to = next;
        } else {
            self.retrying = 0;
            self.phase = next;
            self.resume_to = next;
        }
        Ok(())
    }

    /// Advances to `next` unless the crawl is already at or past it
    ///
    /// Seeds and pages complete in any order, so a late service root must not
    /// drag a paginating crawl back to `HomepageFetched`.
    pub fn reach(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        match (self.base().rank(), next.rank()) {
            (Some(base), Some(target)) if base >= target => Ok(()),
            _ => self.advance(next),
        }
    }

    /// Records that a request started waiting on a session refresh
    pub fn begin_retry(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        self.retrying += 1;
        if self.retrying == 1 {
            self.resume_to = self.phase;
            self.phase = CrawlPhase::Retrying;
        }
    }

    /// Records that a request finished waiting on a session refresh
    pub fn end_retry(&mut self) {
        if self.retrying == 0 {
            return;
        }
        self.retrying -= 1;
        if self.retrying == 0 {
            self.phase = self.resume_to;
        }
    }

    fn base(&self) -> CrawlPhase {
        if self.retrying > 0 {
            self.resume_to
        } else {
            self.phase
        }
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
