//! The upload form state machine.
//!
//! `idle → loading → done`, with a reset transition back to `idle`. The
//! machine is independent of any rendering layer; a UI drives it through the
//! event methods and reads state back through the accessors.

use tracing::warn;

use crate::transport::{Transport, TransportError};

/// Form status. `Loading` blocks interaction until the in-flight upload
/// resolves one way or the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Done,
}

/// A file staged for upload: its name, declared MIME type, and contents.
#[derive(Debug, Clone)]
pub struct StagedFile {
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

/// An HTML fragment received from the analysis service.
///
/// Distinct from a plain string so that only markup produced by the
/// operator's own upstream call can reach a raw rendering path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedHtml(String);

impl TrustedHtml {
    /// Wraps a fragment received from the analysis service. Never call this
    /// with user-entered text.
    pub fn from_upstream(fragment: String) -> Self {
        Self(fragment)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("No file staged")]
    NoFileStaged,

    #[error("An upload is already in flight")]
    AlreadyLoading,
}

/// The upload form component.
#[derive(Debug, Default)]
pub struct UploadClient {
    status: Status,
    staged: Option<StagedFile>,
    dragging: bool,
    analysis: Option<TrustedHtml>,
}

impl UploadClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Purely visual drag-highlight flag.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn staged_file(&self) -> Option<&StagedFile> {
        self.staged.as_ref()
    }

    pub fn analysis(&self) -> Option<&TrustedHtml> {
        self.analysis.as_ref()
    }

    /// File selection via the picker. Re-staging returns the form to `Idle`.
    pub fn stage_file(&mut self, file: StagedFile) {
        self.staged = Some(file);
        self.status = Status::Idle;
    }

    pub fn drag_over(&mut self) {
        self.dragging = true;
    }

    pub fn drag_leave(&mut self) {
        self.dragging = false;
    }

    /// Drop: stages the file and clears the highlight.
    pub fn drop_file(&mut self, file: StagedFile) {
        self.dragging = false;
        self.stage_file(file);
    }

    /// Submission is enabled only when a file is staged and nothing is in
    /// flight.
    pub fn can_submit(&self) -> bool {
        self.staged.is_some() && self.status != Status::Loading
    }

    /// First phase of submission: transitions to `Loading` synchronously and
    /// yields the staged file for the transport.
    pub fn begin_upload(&mut self) -> Result<StagedFile, ClientError> {
        if self.status == Status::Loading {
            return Err(ClientError::AlreadyLoading);
        }
        let file = self.staged.clone().ok_or(ClientError::NoFileStaged)?;
        self.status = Status::Loading;
        Ok(file)
    }

    /// Second phase: applies the transport outcome. Failure reverts to
    /// `Idle` with nothing surfaced to the user.
    pub fn finish_upload(&mut self, outcome: Result<TrustedHtml, TransportError>) {
        match outcome {
            Ok(fragment) => {
                self.analysis = Some(fragment);
                self.status = Status::Done;
            }
            Err(e) => {
                warn!("Upload failed: {e}");
                self.status = Status::Idle;
            }
        }
    }

    /// Full submission flow against a transport.
    pub async fn submit<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
    ) -> Result<(), ClientError> {
        let file = self.begin_upload()?;
        let outcome = transport.upload(&file).await;
        self.finish_upload(outcome);
        Ok(())
    }

    /// Clears the file, result, and status back to `Idle`.
    pub fn reset(&mut self) {
        self.staged = None;
        self.analysis = None;
        self.status = Status::Idle;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
