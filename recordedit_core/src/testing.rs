//! In-memory doubles for the remote services, shared by unit and integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::classify::AttachmentType;
use crate::error::ServiceError;
use crate::models::{Attachment, AttachmentDraft, AttachmentPatch, FileHandle};
use crate::notify::{NotificationVariant, Notifier};
use crate::services::{AttachmentService, FileFolder, RecordService, UploadService};

/// A persisted property image with a predictable path.
pub fn attachment(id: &str, order_index: u32) -> Attachment {
    Attachment {
        id: id.to_string(),
        name: format!("{id}.jpg"),
        full_path: format!("attachment/{id}.jpg"),
        attachment_type: AttachmentType::PropertyImage,
        company_id: None,
        person_id: None,
        author_id: None,
        created_at: "2024-01-01T00:00:00+00:00".to_string(),
        description: None,
        order_index,
    }
}

pub fn image_file(name: &str) -> FileHandle {
    FileHandle::new(name, name.as_bytes().to_vec()).with_mime("image/png")
}

/// Every call observed by [`InMemoryBackend`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Upload { name: String },
    Create { name: String, order_index: u32, description: String },
    Update { id: String, patch: AttachmentPatch },
    Delete { id: String },
    UpdateRecord { record_id: String, fields: Map<String, Value> },
}

#[derive(Debug, Default)]
struct BackendState {
    calls: Vec<RemoteCall>,
    attachments: HashMap<String, Attachment>,
    records: HashMap<String, Map<String, Value>>,
    next_id: usize,
}

/// Backend double that stores attachments and records in memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    latency: Option<Duration>,
    rejected_fields: HashMap<String, String>,
    failing_uploads: HashSet<String>,
    failing_updates: HashSet<String>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attachments(self, attachments: impl IntoIterator<Item = Attachment>) -> Self {
        {
            let mut state = self.lock();
            for attachment in attachments {
                state.attachments.insert(attachment.id.clone(), attachment);
            }
        }
        self
    }

    pub fn with_record(self, record_id: &str, fields: Map<String, Value>) -> Self {
        self.lock().records.insert(record_id.to_string(), fields);
        self
    }

    /// Every remote call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn rejecting_field(mut self, field: &str, message: &str) -> Self {
        self.rejected_fields
            .insert(field.to_string(), message.to_string());
        self
    }

    pub fn failing_upload(mut self, file_name: &str) -> Self {
        self.failing_uploads.insert(file_name.to_string());
        self
    }

    pub fn failing_update(mut self, attachment_id: &str) -> Self {
        self.failing_updates.insert(attachment_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn image_calls(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, RemoteCall::UpdateRecord { .. }))
            .collect()
    }

    pub fn stored_attachment(&self, id: &str) -> Option<Attachment> {
        self.lock().attachments.get(id).cloned()
    }

    pub fn stored_attachment_count(&self) -> usize {
        self.lock().attachments.len()
    }

    pub fn stored_record(&self, record_id: &str) -> Option<Map<String, Value>> {
        self.lock().records.get(record_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: RemoteCall) {
        self.lock().calls.push(call);
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl UploadService for InMemoryBackend {
    async fn upload(&self, file: &FileHandle, folder: FileFolder) -> Result<String, ServiceError> {
        self.record(RemoteCall::Upload {
            name: file.name.clone(),
        });
        self.simulate_latency().await;
        if self.failing_uploads.contains(&file.name) {
            return Err(ServiceError::Upload(format!("storage rejected {}", file.name)));
        }
        let folder = folder.as_str().to_ascii_lowercase();
        Ok(format!("{folder}/{}?token=signed", file.name))
    }
}

#[async_trait]
impl AttachmentService for InMemoryBackend {
    async fn create(&self, draft: AttachmentDraft) -> Result<Attachment, ServiceError> {
        self.record(RemoteCall::Create {
            name: draft.name.clone(),
            order_index: draft.order_index,
            description: draft.description.clone(),
        });
        self.simulate_latency().await;
        let mut state = self.lock();
        state.next_id += 1;
        let parent = draft.parent_link();
        let attachment = Attachment {
            id: format!("created-{}", state.next_id),
            name: draft.name.clone(),
            full_path: draft.full_path.clone(),
            attachment_type: draft.attachment_type,
            company_id: parent
                .filter(|(field, _)| *field == "companyId")
                .map(|(_, id)| id.to_string()),
            person_id: parent
                .filter(|(field, _)| *field == "personId")
                .map(|(_, id)| id.to_string()),
            author_id: draft.author_id.clone(),
            created_at: draft.created_at.clone(),
            description: Some(draft.description.clone()),
            order_index: draft.order_index,
        };
        state
            .attachments
            .insert(attachment.id.clone(), attachment.clone());
        Ok(attachment)
    }

    async fn update(&self, id: &str, patch: AttachmentPatch) -> Result<Attachment, ServiceError> {
        self.record(RemoteCall::Update {
            id: id.to_string(),
            patch: patch.clone(),
        });
        self.simulate_latency().await;
        if self.failing_updates.contains(id) {
            return Err(ServiceError::Unavailable(format!("update of {id} timed out")));
        }
        let mut state = self.lock();
        let attachment = state
            .attachments
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(format!("attachment {id}")))?;
        patch.apply_to(attachment);
        Ok(attachment.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.record(RemoteCall::Delete { id: id.to_string() });
        self.simulate_latency().await;
        self.lock()
            .attachments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("attachment {id}")))
    }
}

#[async_trait]
impl RecordService for InMemoryBackend {
    async fn update(
        &self,
        _object_name_singular: &str,
        record_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Map<String, Value>, ServiceError> {
        self.record(RemoteCall::UpdateRecord {
            record_id: record_id.to_string(),
            fields: fields.clone(),
        });
        self.simulate_latency().await;
        if let Some((field, message)) = self
            .rejected_fields
            .iter()
            .find(|(field, _)| fields.contains_key(field.as_str()))
        {
            return Err(ServiceError::Validation(format!("{field}: {message}")));
        }
        let mut state = self.lock();
        let record = state.records.entry(record_id.to_string()).or_default();
        for (name, value) in fields {
            record.insert(name, value);
        }
        Ok(record.clone())
    }
}

/// Collects notifications instead of showing them.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<(NotificationVariant, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(NotificationVariant, String)> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, variant: NotificationVariant, message: &str) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((variant, message.to_string()));
        }
    }
}
