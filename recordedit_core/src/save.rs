//! Persisting an edit session: record fields first, then image reconciliation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde_json::{Map, Value};

use crate::classify::AttachmentType;
use crate::config::EditorConfig;
use crate::error::{ImageOpFailure, ImageOpKind, SaveError, ServiceError};
use crate::images::{ImageSource, PropertyImageState};
use crate::models::{Attachment, AttachmentDraft, AttachmentPatch, EditTarget, FileHandle};
use crate::notify::{NotificationVariant, Notifier, TracingNotifier};
use crate::services::{EditServices, FileFolder};
use crate::session::SharedSession;
use crate::utils::{now_utc_iso, path_without_token};

const SAVED_NOTIFICATION: &str = "Record saved";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
}

/// A staged file that still has to be uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub entry_id: String,
    pub file: FileHandle,
    pub order_index: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentUpdate {
    pub id: String,
    pub patch: AttachmentPatch,
}

/// Remote work needed to make the persisted images match the working set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageDiff {
    pub to_create: Vec<PendingUpload>,
    pub to_update: Vec<AttachmentUpdate>,
    pub to_delete: Vec<String>,
    /// Persisted entries that need no call.
    pub unchanged: Vec<Attachment>,
}

impl ImageDiff {
    pub fn compute(images: &PropertyImageState) -> Self {
        let mut diff = ImageDiff::default();
        for entry in images.entries() {
            match &entry.source {
                ImageSource::Pending(file) => diff.to_create.push(PendingUpload {
                    entry_id: entry.id.clone(),
                    file: file.clone(),
                    order_index: entry.order_index,
                    description: entry.description.clone(),
                }),
                ImageSource::Remote(remote) => {
                    let original = images
                        .persisted()
                        .iter()
                        .find(|persisted| persisted.id == entry.id)
                        .unwrap_or(remote);
                    let mut patch = AttachmentPatch::default();
                    if original.order_index != entry.order_index {
                        patch.order_index = Some(entry.order_index);
                    }
                    if original.description_or_empty() != entry.description {
                        patch.description = Some(entry.description.clone());
                    }
                    if patch.is_empty() {
                        diff.unchanged.push(original.clone());
                    } else {
                        diff.to_update.push(AttachmentUpdate {
                            id: entry.id.clone(),
                            patch,
                        });
                    }
                }
            }
        }
        diff.to_delete = images
            .persisted()
            .iter()
            .filter(|persisted| images.get(&persisted.id).is_none())
            .map(|persisted| persisted.id.clone())
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// What the caller should do after a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub navigate_to: String,
    pub navigate_after: Duration,
    pub fields_saved: bool,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SaveOutcome {
    /// Waits out the confirmation delay and yields the link to navigate to.
    pub async fn navigation(&self) -> &str {
        if !self.navigate_after.is_zero() {
            tokio::time::sleep(self.navigate_after).await;
        }
        &self.navigate_to
    }
}

enum ImageOp {
    Create(PendingUpload),
    Update(AttachmentUpdate),
    Delete(String),
}

enum ImageOpDone {
    Created { entry_id: String, attachment: Attachment },
    Updated(Attachment),
    Deleted(String),
}

struct SavePlan {
    fields: Option<Map<String, Value>>,
    base_fields: Map<String, Value>,
    diff: ImageDiff,
    dirty: bool,
}

/// Runs at most one save at a time for a single edit session.
pub struct SaveCoordinator {
    target: EditTarget,
    services: EditServices,
    config: EditorConfig,
    notifier: Arc<dyn Notifier>,
    saving: AtomicBool,
}

impl SaveCoordinator {
    pub fn new(target: EditTarget, services: EditServices, config: EditorConfig) -> Self {
        Self {
            target,
            services,
            config,
            notifier: Arc::new(TracingNotifier),
            saving: AtomicBool::new(false),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn status(&self) -> SaveStatus {
        if self.saving.load(Ordering::Acquire) {
            SaveStatus::Saving
        } else {
            SaveStatus::Idle
        }
    }

    /// Persists the session. Rejects with [`SaveError::AlreadySaving`] while
    /// another save is in flight. Every other failure is also reported to the
    /// notifier and leaves the session editable and dirty.
    pub async fn save(&self, session: &SharedSession) -> Result<SaveOutcome, SaveError> {
        let _saving = self.begin()?;
        let result = self.run(session).await;
        if let Err(err) = &result {
            self.notifier
                .notify(NotificationVariant::Error, &err.to_string());
        }
        result
    }

    fn begin(&self) -> Result<SavingGuard<'_>, SaveError> {
        if self
            .saving
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(record_id = %self.target.record_id, "save already in flight, ignoring");
            return Err(SaveError::AlreadySaving);
        }
        Ok(SavingGuard(&self.saving))
    }

    async fn run(&self, session: &SharedSession) -> Result<SaveOutcome, SaveError> {
        let plan = session.with_session(|session| SavePlan {
            fields: session
                .fields()
                .is_dirty()
                .then(|| session.fields().pending().clone()),
            base_fields: session.snapshot().fields.clone(),
            diff: ImageDiff::compute(session.images()),
            dirty: session.is_dirty(),
        })?;

        let navigate_to = self
            .config
            .show_page_link(&self.target.object_name_singular, &self.target.record_id);
        if !plan.dirty {
            return Ok(SaveOutcome {
                navigate_to,
                navigate_after: self.config.navigate_delay,
                fields_saved: false,
                created: 0,
                updated: 0,
                deleted: 0,
            });
        }

        let SavePlan {
            fields,
            base_fields,
            diff,
            ..
        } = plan;
        tracing::info!(
            record_id = %self.target.record_id,
            fields = fields.as_ref().map_or(0, |f| f.len()),
            creates = diff.to_create.len(),
            updates = diff.to_update.len(),
            deletes = diff.to_delete.len(),
            "saving record"
        );

        let fields_saved = fields.is_some();
        let persisted_fields = match fields {
            Some(fields) => {
                let persisted = self
                    .services
                    .records
                    .update(
                        &self.target.object_name_singular,
                        &self.target.record_id,
                        fields,
                    )
                    .await
                    .map_err(|err| {
                        tracing::error!(record_id = %self.target.record_id, error = %err, "record update failed");
                        SaveError::RecordUpdate(err)
                    })?;
                let mut merged = base_fields;
                merged.extend(persisted);
                merged
            }
            None => base_fields,
        };

        let ImageDiff {
            to_create,
            to_update,
            to_delete,
            unchanged,
        } = diff;
        let ops: Vec<ImageOp> = to_create
            .into_iter()
            .map(ImageOp::Create)
            .chain(to_update.into_iter().map(ImageOp::Update))
            .chain(to_delete.into_iter().map(ImageOp::Delete))
            .collect();
        let results: Vec<Result<ImageOpDone, ImageOpFailure>> = stream::iter(ops)
            .map(|op| self.execute(op))
            .buffer_unordered(self.config.image_concurrency.max(1))
            .collect()
            .await;

        let mut done = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(op) => done.push(op),
                Err(failure) => failures.push(failure),
            }
        }

        let (mut created, mut updated, mut deleted) = (0, 0, 0);
        for op in &done {
            match op {
                ImageOpDone::Created { .. } => created += 1,
                ImageOpDone::Updated(_) => updated += 1,
                ImageOpDone::Deleted(_) => deleted += 1,
            }
        }

        if !failures.is_empty() {
            tracing::warn!(
                record_id = %self.target.record_id,
                failed = failures.len(),
                succeeded = done.len(),
                "image reconciliation partially failed"
            );
            session.with_session(|session| {
                if fields_saved {
                    session.commit_fields(persisted_fields);
                }
                let images = session.images_mut();
                for op in done {
                    match op {
                        ImageOpDone::Created {
                            entry_id,
                            attachment,
                        } => images.promote(&entry_id, attachment),
                        ImageOpDone::Updated(attachment) => images.upsert_persisted(attachment),
                        ImageOpDone::Deleted(id) => images.forget_persisted(&id),
                    }
                }
            })?;
            return Err(SaveError::Images { failures });
        }

        let mut property_images = unchanged;
        for op in done {
            match op {
                ImageOpDone::Created { attachment, .. } | ImageOpDone::Updated(attachment) => {
                    property_images.push(attachment)
                }
                ImageOpDone::Deleted(_) => {}
            }
        }
        session.with_session(|session| {
            let attachments = session.merged_attachments(property_images);
            session.commit(persisted_fields, attachments);
        })?;

        tracing::info!(
            record_id = %self.target.record_id,
            created,
            updated,
            deleted,
            "record saved"
        );
        self.notifier
            .notify(NotificationVariant::Success, SAVED_NOTIFICATION);
        Ok(SaveOutcome {
            navigate_to,
            navigate_after: self.config.navigate_delay,
            fields_saved,
            created,
            updated,
            deleted,
        })
    }

    async fn execute(&self, op: ImageOp) -> Result<ImageOpDone, ImageOpFailure> {
        match op {
            ImageOp::Create(upload) => {
                let entry_id = upload.entry_id.clone();
                self.create_image(upload)
                    .await
                    .map(|attachment| ImageOpDone::Created {
                        entry_id: entry_id.clone(),
                        attachment,
                    })
                    .map_err(|error| ImageOpFailure {
                        kind: ImageOpKind::Create,
                        entry_id,
                        error,
                    })
            }
            ImageOp::Update(update) => self
                .services
                .attachments
                .update(&update.id, update.patch)
                .await
                .map(ImageOpDone::Updated)
                .map_err(|error| ImageOpFailure {
                    kind: ImageOpKind::Update,
                    entry_id: update.id,
                    error,
                }),
            ImageOp::Delete(id) => match self.services.attachments.delete(&id).await {
                Ok(()) => Ok(ImageOpDone::Deleted(id)),
                Err(ServiceError::NotFound(_)) => {
                    tracing::warn!(attachment_id = %id, "attachment already gone, treating as deleted");
                    Ok(ImageOpDone::Deleted(id))
                }
                Err(error) => Err(ImageOpFailure {
                    kind: ImageOpKind::Delete,
                    entry_id: id,
                    error,
                }),
            },
        }
    }

    async fn create_image(&self, upload: PendingUpload) -> Result<Attachment, ServiceError> {
        self.upload_attachment(
            &upload.file,
            Some(AttachmentType::PropertyImage),
            upload.order_index,
            upload.description,
        )
        .await
    }

    /// Uploads a file and links a new attachment to the record under edit.
    ///
    /// Without an explicit `attachment_type` the type is guessed from the file name.
    pub async fn upload_attachment(
        &self,
        file: &FileHandle,
        attachment_type: Option<AttachmentType>,
        order_index: u32,
        description: String,
    ) -> Result<Attachment, ServiceError> {
        let remote_path = self
            .services
            .uploads
            .upload(file, FileFolder::Attachment)
            .await?;
        if remote_path.trim().is_empty() {
            return Err(ServiceError::Upload(format!("couldn't upload {}", file.name)));
        }

        let mut parent = Map::new();
        parent.insert(
            self.target.parent_field_name(),
            Value::String(self.target.record_id.clone()),
        );
        let draft = AttachmentDraft {
            name: file.name.clone(),
            full_path: path_without_token(&remote_path),
            attachment_type: attachment_type
                .unwrap_or_else(|| AttachmentType::from_file_name(&file.name)),
            author_id: self.target.author_id.clone(),
            created_at: now_utc_iso(),
            order_index,
            description,
            parent,
        };
        self.services.attachments.create(draft).await
    }
}

struct SavingGuard<'a>(&'a AtomicBool);

impl Drop for SavingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
