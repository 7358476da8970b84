// transitcard-rs/transitcard/src/progress.rs

//! Progress reporting hooks. Sinks never influence the read path.

use crate::types::CardKind;

/// Observer of a running scan.
pub trait ProgressSink {
    fn update_status(&mut self, status: &str);

    fn update_progress(&mut self, done: usize, total: usize);

    fn announce_card_kind(&mut self, kind: CardKind);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn update_status(&mut self, _status: &str) {}

    fn update_progress(&mut self, _done: usize, _total: usize) {}

    fn announce_card_kind(&mut self, _kind: CardKind) {}
}

/// Forwards events to `log::info!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn update_status(&mut self, status: &str) {
        log::info!("{}", status);
    }

    fn update_progress(&mut self, done: usize, total: usize) {
        log::info!("progress {}/{}", done, total);
    }

    fn announce_card_kind(&mut self, kind: CardKind) {
        log::info!("card kind: {}", kind);
    }
}

/// Records every event. Handy in tests and for UIs that poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingProgress {
    pub statuses: Vec<String>,
    pub progress: Vec<(usize, usize)>,
    pub kinds: Vec<CardKind>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported `(done, total)`.
    pub fn last(&self) -> Option<(usize, usize)> {
        self.progress.last().copied()
    }
}

impl ProgressSink for RecordingProgress {
    fn update_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }

    fn update_progress(&mut self, done: usize, total: usize) {
        self.progress.push((done, total));
    }

    fn announce_card_kind(&mut self, kind: CardKind) {
        self.kinds.push(kind);
    }
}
