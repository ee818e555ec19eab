//! Remote collaborators the save coordinator talks to.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ServiceError;
use crate::models::{Attachment, AttachmentDraft, AttachmentPatch, FileHandle};

/// Storage folder an upload lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFolder {
    Attachment,
}

impl FileFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFolder::Attachment => "Attachment",
        }
    }
}

#[async_trait]
pub trait UploadService: Send + Sync {
    /// Stores the bytes and returns their remote path (possibly carrying a `?token=` query).
    async fn upload(&self, file: &FileHandle, folder: FileFolder) -> Result<String, ServiceError>;
}

#[async_trait]
pub trait AttachmentService: Send + Sync {
    async fn create(&self, draft: AttachmentDraft) -> Result<Attachment, ServiceError>;
    async fn update(&self, id: &str, patch: AttachmentPatch) -> Result<Attachment, ServiceError>;
    async fn delete(&self, id: &str) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait RecordService: Send + Sync {
    /// Applies field overrides and returns the record's persisted field values.
    async fn update(
        &self,
        object_name_singular: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ServiceError>;
}

/// Bundle of every remote collaborator used by a save.
#[derive(Clone)]
pub struct EditServices {
    pub uploads: Arc<dyn UploadService>,
    pub attachments: Arc<dyn AttachmentService>,
    pub records: Arc<dyn RecordService>,
}

impl EditServices {
    pub fn new(
        uploads: Arc<dyn UploadService>,
        attachments: Arc<dyn AttachmentService>,
        records: Arc<dyn RecordService>,
    ) -> Self {
        Self {
            uploads,
            attachments,
            records,
        }
    }

    /// Uses one backend for all three roles.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UploadService + AttachmentService + RecordService + 'static,
    {
        Self {
            uploads: backend.clone(),
            attachments: backend.clone(),
            records: backend,
        }
    }
}
