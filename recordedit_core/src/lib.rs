pub mod classify;
pub mod config;
pub mod error;
pub mod fields;
pub mod images;
pub mod models;
pub mod notify;
pub mod ordering;
pub mod previews;
pub mod save;
pub mod services;
pub mod session;
pub mod telemetry;
pub mod utils;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use classify::{AttachmentIcon, AttachmentType, IconColor};
pub use config::EditorConfig;
pub use error::{EditError, ImageOpFailure, ImageOpKind, SaveError, ServiceError};
pub use images::{ImageSource, PropertyImageEntry, PropertyImageState};
pub use models::{
    Attachment, AttachmentDraft, AttachmentPatch, EditTarget, FileHandle, RecordSnapshot,
};
pub use save::{ImageDiff, SaveCoordinator, SaveOutcome, SaveStatus};
pub use services::{AttachmentService, EditServices, FileFolder, RecordService, UploadService};
pub use session::{NavigationDecision, RecordEditSession, SharedSession};
