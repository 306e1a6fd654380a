/// Crawl run lifecycle
use std::fmt;

/// Phase of a crawl run
///
/// A run starts `Running`. It moves to `Draining` once no new work will be
/// handed out (frontier exhausted, page budget spent, or stop requested) and
/// to `Stopped` when every worker has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Workers are dequeuing and fetching
    Running,

    /// No further records will be handed out; in-flight fetches may finish
    Draining,

    /// All workers have exited
    Stopped,
}

impl CrawlPhase {
    /// Returns true while workers may still receive new records
    pub fn accepts_work(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Checks whether moving from this phase to `next` is allowed
    ///
    /// Phases only move forward. Staying in the same phase is allowed so that
    /// several workers can observe exhaustion concurrently.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Running, _)
                | (Self::Draining, Self::Draining)
                | (Self::Draining, Self::Stopped)
                | (Self::Stopped, Self::Stopped)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
