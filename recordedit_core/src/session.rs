use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::error::EditError;
use crate::fields::FieldEditState;
use crate::images::PropertyImageState;
use crate::models::{Attachment, RecordSnapshot};
use crate::previews::PreviewUrls;

pub const UNSAVED_CHANGES_PROMPT: &str =
    "You have unsaved changes. Are you sure you want to leave?";

/// Edit state of one record, owned by whatever view mounts the editor.
///
/// Dropping the session releases every preview handle it still holds.
#[derive(Debug)]
pub struct RecordEditSession {
    snapshot: RecordSnapshot,
    fields: FieldEditState,
    images: PropertyImageState,
}

impl RecordEditSession {
    pub fn new(snapshot: RecordSnapshot, previews: Arc<dyn PreviewUrls>) -> Self {
        let fields = FieldEditState::new(snapshot.fields.clone());
        let images = PropertyImageState::new(snapshot.property_images(), previews);
        Self {
            snapshot,
            fields,
            images,
        }
    }

    pub fn shared(self) -> SharedSession {
        SharedSession::new(self)
    }

    pub fn snapshot(&self) -> &RecordSnapshot {
        &self.snapshot
    }

    pub fn fields(&self) -> &FieldEditState {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldEditState {
        &mut self.fields
    }

    pub fn images(&self) -> &PropertyImageState {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut PropertyImageState {
        &mut self.images
    }

    pub fn set_field(&mut self, field: impl Into<String>, value: Value) {
        self.fields.set(field, value);
    }

    /// True when either pending fields or the image set diverge from the snapshot.
    pub fn is_dirty(&self) -> bool {
        self.fields.is_dirty() || self.images.is_dirty()
    }

    /// Discards all pending state.
    pub fn reset(&mut self) {
        self.fields.reset();
        self.images.reset();
    }

    /// Adopts a persisted result as the new clean baseline.
    pub fn commit(&mut self, fields: Map<String, Value>, attachments: Vec<Attachment>) {
        self.snapshot.fields = fields;
        self.snapshot.attachments = attachments;
        self.fields.commit(self.snapshot.fields.clone());
        self.images.commit(&self.snapshot.attachments);
    }

    /// Adopts persisted field values without touching the image set.
    pub(crate) fn commit_fields(&mut self, fields: Map<String, Value>) {
        self.snapshot.fields = fields;
        self.fields.commit(self.snapshot.fields.clone());
    }

    /// Replaces property-image attachments in the snapshot, keeping every other attachment.
    pub(crate) fn merged_attachments(&self, property_images: Vec<Attachment>) -> Vec<Attachment> {
        self.snapshot
            .attachments
            .iter()
            .filter(|attachment| !attachment.is_property_image())
            .cloned()
            .chain(property_images)
            .collect()
    }

    /// Decides whether leaving `current_path` for `next_path` must be blocked.
    ///
    /// `confirm` is only asked when there is unsaved state and the next path
    /// leaves the current page. Confirming discards the pending state.
    pub fn guard_navigation(
        &mut self,
        current_path: &str,
        next_path: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> NavigationDecision {
        if !self.is_dirty() || next_path.contains(current_path) {
            return NavigationDecision::Allow;
        }
        if confirm(UNSAVED_CHANGES_PROMPT) {
            tracing::info!(record_id = %self.snapshot.id, "discarding unsaved changes on navigation");
            self.reset();
            NavigationDecision::Allow
        } else {
            NavigationDecision::Block
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    Block,
}

/// Session handle shared between the view and the save coordinator.
///
/// The lock is only held for synchronous mutations, never across a remote call.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<RecordEditSession>>,
}

impl SharedSession {
    pub fn new(session: RecordEditSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn with_session<T, F>(&self, f: F) -> Result<T, EditError>
    where
        F: FnOnce(&mut RecordEditSession) -> T,
    {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| EditError::SessionPoisoned)?;
        Ok(f(&mut *guard))
    }

    pub fn is_dirty(&self) -> Result<bool, EditError> {
        self.with_session(|session| session.is_dirty())
    }
}
