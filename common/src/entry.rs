use crate::errors;

/// Lifecycle of an upload entry. Transitions only move forward:
/// `Ready -> Queued -> (Succeeded | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Ready,
    Queued,
    Succeeded,
    Failed,
}

/// One file slated for upload: source path, destination path, size and
/// lifecycle state. Each entry is executed by exactly one task, so the state
/// needs no locking - the entry is moved into the task and the final state
/// comes back with the outcome.
#[derive(Debug, Clone)]
pub struct UploadEntry {
    source: std::path::PathBuf,
    dest: std::path::PathBuf,
    size: u64,
    state: State,
    started: Option<std::time::Instant>,
    finished: Option<std::time::Instant>,
    failure: Option<errors::Error>,
}

impl UploadEntry {
    #[must_use]
    pub fn new(source: std::path::PathBuf, dest: std::path::PathBuf, size: u64) -> Self {
        Self {
            source,
            dest,
            size,
            state: State::Ready,
            started: None,
            finished: None,
            failure: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> &std::path::Path {
        &self.source
    }

    #[must_use]
    pub fn dest(&self) -> &std::path::Path {
        &self.dest
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn in_state(&self, state: State) -> bool {
        self.state == state
    }

    /// Move `Ready -> Queued`; returns false if the entry was already queued
    /// or terminal, which is the idempotent-submit sentinel.
    pub fn mark_queued(&mut self) -> bool {
        if self.state != State::Ready {
            return false;
        }
        self.state = State::Queued;
        true
    }

    pub fn mark_started(&mut self) {
        self.started = Some(std::time::Instant::now());
    }

    pub fn mark_finished(&mut self, state: State) {
        self.state = state;
        self.finished = Some(std::time::Instant::now());
    }

    pub fn set_failure(&mut self, failure: errors::Error) {
        self.failure = Some(failure);
    }

    #[must_use]
    pub fn failure(&self) -> Option<&errors::Error> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        Some(self.finished? - self.started?)
    }
}

impl std::fmt::Display for UploadEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:?} -> {:?} (size: {}, state: {:?})",
            self.source,
            self.dest,
            bytesize::ByteSize(self.size),
            self.state
        )
    }
}
