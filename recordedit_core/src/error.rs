use thiserror::Error;

/// Misuse of the local edit state. These are programmer errors, not user-recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("index {index} out of range for {len} images")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no image entry with id {0}")]
    UnknownEntry(String),
    #[error("edit session lock poisoned")]
    SessionPoisoned,
}

/// Failure reported by one of the remote collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Which remote operation an image failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOpKind {
    Create,
    Update,
    Delete,
}

impl ImageOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageOpKind::Create => "create",
            ImageOpKind::Update => "update",
            ImageOpKind::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} image {entry_id}: {error}", .kind.as_str())]
pub struct ImageOpFailure {
    pub kind: ImageOpKind,
    pub entry_id: String,
    pub error: ServiceError,
}

/// Why a save did not complete. The message is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    #[error("a save is already in progress")]
    AlreadySaving,
    #[error("Something went wrong while saving the record: {0}")]
    RecordUpdate(ServiceError),
    #[error("Something went wrong while saving the record: {}", summarize(.failures))]
    Images { failures: Vec<ImageOpFailure> },
    #[error("Something went wrong while saving the record: {0}")]
    Session(#[from] EditError),
}

fn summarize(failures: &[ImageOpFailure]) -> String {
    match failures {
        [] => "no image operations failed".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
