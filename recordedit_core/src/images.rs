use std::sync::Arc;

use uuid::Uuid;

use crate::error::EditError;
use crate::models::{Attachment, FileHandle};
use crate::ordering::{self, Ordered};
use crate::previews::PreviewUrls;

/// Where an entry's bytes live: already persisted, or staged locally.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Remote(Attachment),
    Pending(FileHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyImageEntry {
    pub id: String,
    pub source: ImageSource,
    pub preview_url: String,
    pub order_index: u32,
    pub description: String,
}

impl PropertyImageEntry {
    fn from_attachment(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id.clone(),
            preview_url: attachment.full_path.clone(),
            order_index: attachment.order_index,
            description: attachment.description_or_empty().to_string(),
            source: ImageSource::Remote(attachment.clone()),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.source, ImageSource::Remote(_))
    }

    pub fn remote(&self) -> Option<&Attachment> {
        match &self.source {
            ImageSource::Remote(attachment) => Some(attachment),
            ImageSource::Pending(_) => None,
        }
    }

    pub fn pending_file(&self) -> Option<&FileHandle> {
        match &self.source {
            ImageSource::Pending(file) => Some(file),
            ImageSource::Remote(_) => None,
        }
    }
}

impl Ordered for PropertyImageEntry {
    fn order_index(&self) -> u32 {
        self.order_index
    }

    fn set_order_index(&mut self, order_index: u32) {
        self.order_index = order_index;
    }
}

/// Working set of property images for one edit session.
///
/// Owns the preview handles of its pending entries: each one is released when
/// the entry leaves the set, on `reset`, on `commit`, or when the state is dropped.
pub struct PropertyImageState {
    entries: Vec<PropertyImageEntry>,
    persisted: Vec<Attachment>,
    dirty: bool,
    previews: Arc<dyn PreviewUrls>,
}

impl PropertyImageState {
    pub fn new<'a>(
        attachments: impl IntoIterator<Item = &'a Attachment>,
        previews: Arc<dyn PreviewUrls>,
    ) -> Self {
        let persisted = property_images(attachments);
        let entries = persisted
            .iter()
            .map(PropertyImageEntry::from_attachment)
            .collect();
        Self {
            entries,
            persisted,
            dirty: false,
            previews,
        }
    }

    /// Entries in working-set order (not necessarily render order).
    pub fn entries(&self) -> &[PropertyImageEntry] {
        &self.entries
    }

    /// Entries in render order.
    pub fn displayed(&self) -> Vec<&PropertyImageEntry> {
        ordering::sorted_for_display(&self.entries)
    }

    pub fn get(&self, entry_id: &str) -> Option<&PropertyImageEntry> {
        self.entries.iter().find(|entry| entry.id == entry_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Property images as of the last persisted snapshot.
    pub fn persisted(&self) -> &[Attachment] {
        &self.persisted
    }

    /// Stages a local file at the end of the gallery and returns its entry id.
    pub fn add(&mut self, file: FileHandle) -> String {
        let id = Uuid::new_v4().to_string();
        let preview_url = self.previews.create(&file);
        let order_index = self.entries.len() as u32;
        tracing::debug!(entry_id = %id, name = %file.name, order_index, "staged property image");
        self.entries.push(PropertyImageEntry {
            id: id.clone(),
            source: ImageSource::Pending(file),
            preview_url,
            order_index,
            description: String::new(),
        });
        self.dirty = true;
        id
    }

    pub fn add_many(&mut self, files: impl IntoIterator<Item = FileHandle>) -> Vec<String> {
        files.into_iter().map(|file| self.add(file)).collect()
    }

    /// Drops an entry. Returns whether anything was removed.
    pub fn remove(&mut self, entry_id: &str) -> bool {
        let Some(position) = self.entries.iter().position(|entry| entry.id == entry_id) else {
            return false;
        };
        let entry = self.entries.remove(position);
        self.release_preview(&entry);
        self.dirty = true;
        tracing::debug!(entry_id, "removed property image");
        true
    }

    pub fn update_description(
        &mut self,
        entry_id: &str,
        description: impl Into<String>,
    ) -> Result<(), EditError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or_else(|| EditError::UnknownEntry(entry_id.to_string()))?;
        entry.description = description.into();
        self.dirty = true;
        Ok(())
    }

    /// Replaces the working set with an already reordered list.
    ///
    /// Entries are matched to the held ones by id: only their order and
    /// description are taken from `ordered`, so the set keeps ownership of its
    /// current sources and preview handles. Ids the set does not hold are
    /// ignored. Held pending entries missing from `ordered` are released.
    /// Always marks the set dirty, even when the order did not change.
    pub fn reorder(&mut self, ordered: Vec<PropertyImageEntry>) {
        let mut held = std::mem::take(&mut self.entries);
        let mut next = Vec::with_capacity(ordered.len());
        for wanted in ordered {
            match held.iter().position(|entry| entry.id == wanted.id) {
                Some(position) => {
                    let mut entry = held.remove(position);
                    entry.order_index = wanted.order_index;
                    entry.description = wanted.description;
                    next.push(entry);
                }
                None => tracing::warn!(entry_id = %wanted.id, "ignoring unknown entry in reorder"),
            }
        }
        for dropped in &held {
            self.release_preview(dropped);
        }
        self.entries = next;
        self.dirty = true;
        tracing::debug!(count = self.entries.len(), "reordered property images");
    }

    /// Moves an entry between two render positions.
    pub fn move_entry(&mut self, source: usize, dest: usize) -> Result<(), EditError> {
        let displayed: Vec<PropertyImageEntry> =
            self.displayed().into_iter().cloned().collect();
        let ordered = ordering::reorder(&displayed, source, dest)?;
        self.reorder(ordered);
        Ok(())
    }

    /// Regenerates the preview handle of every pending entry.
    pub fn refresh_preview_urls(&mut self) {
        for entry in &mut self.entries {
            if let ImageSource::Pending(file) = &entry.source {
                self.previews.release(&entry.preview_url);
                entry.preview_url = self.previews.create(file);
            }
        }
    }

    /// Reverts to the last persisted snapshot.
    pub fn reset(&mut self) {
        self.release_all();
        self.entries = self
            .persisted
            .iter()
            .map(PropertyImageEntry::from_attachment)
            .collect();
        self.dirty = false;
    }

    /// Adopts a freshly persisted attachment list as the new clean baseline.
    pub fn commit<'a>(&mut self, attachments: impl IntoIterator<Item = &'a Attachment>) {
        self.persisted = property_images(attachments);
        self.reset();
    }

    /// Turns a pending entry into a remote one after its upload succeeded.
    /// The set stays dirty; the new attachment joins the persisted baseline.
    pub fn promote(&mut self, entry_id: &str, attachment: Attachment) {
        let previews = Arc::clone(&self.previews);
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == entry_id) {
            if entry.is_remote() {
                return;
            }
            previews.release(&entry.preview_url);
            entry.id = attachment.id.clone();
            entry.preview_url = attachment.full_path.clone();
            entry.source = ImageSource::Remote(attachment.clone());
        }
        self.upsert_persisted(attachment);
    }

    /// Records that an attachment was updated remotely.
    pub fn upsert_persisted(&mut self, attachment: Attachment) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == attachment.id) {
            entry.source = ImageSource::Remote(attachment.clone());
        }
        match self.persisted.iter_mut().find(|p| p.id == attachment.id) {
            Some(existing) => *existing = attachment,
            None => self.persisted.push(attachment),
        }
    }

    /// Records that an attachment was deleted remotely.
    pub fn forget_persisted(&mut self, attachment_id: &str) {
        self.persisted.retain(|attachment| attachment.id != attachment_id);
    }

    /// Releases every outstanding preview handle and empties the set.
    pub fn teardown(&mut self) {
        self.release_all();
        self.dirty = false;
    }

    fn release_all(&mut self) {
        for entry in std::mem::take(&mut self.entries) {
            self.release_preview(&entry);
        }
    }

    fn release_preview(&self, entry: &PropertyImageEntry) {
        if !entry.is_remote() {
            self.previews.release(&entry.preview_url);
        }
    }
}

impl Drop for PropertyImageState {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl std::fmt::Debug for PropertyImageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyImageState")
            .field("entries", &self.entries)
            .field("persisted", &self.persisted)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

/// Property-image attachments, deduplicated by id. A later duplicate replaces
/// the earlier data but keeps the earlier position.
fn property_images<'a>(attachments: impl IntoIterator<Item = &'a Attachment>) -> Vec<Attachment> {
    let mut images: Vec<Attachment> = Vec::new();
    for attachment in attachments {
        if !attachment.is_property_image() {
            continue;
        }
        match images.iter_mut().find(|existing| existing.id == attachment.id) {
            Some(existing) => *existing = attachment.clone(),
            None => images.push(attachment.clone()),
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::AttachmentType;
    use crate::previews::ObjectUrlRegistry;
    use crate::testing::attachment;
    use pretty_assertions::assert_eq;

    fn state_with(attachments: &[Attachment]) -> (PropertyImageState, Arc<ObjectUrlRegistry>) {
        let registry = Arc::new(ObjectUrlRegistry::new());
        let state = PropertyImageState::new(attachments, registry.clone());
        (state, registry)
    }

    fn file(name: &str) -> FileHandle {
        FileHandle::new(name, name.as_bytes().to_vec())
    }

    fn ids(entries: Vec<&PropertyImageEntry>) -> Vec<String> {
        entries.into_iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn initializes_from_property_images_only() {
        let mut flyer = attachment("flyer", 0);
        flyer.attachment_type = AttachmentType::PropertyFlyer;
        let (state, _) = state_with(&[attachment("a", 1), flyer, attachment("b", 0)]);

        assert_eq!(state.len(), 2);
        assert!(!state.is_dirty());
        assert_eq!(ids(state.displayed()), vec!["b", "a"]);
        let entry = state.get("a").expect("entry a");
        assert!(entry.is_remote());
        assert_eq!(entry.preview_url, "attachment/a.jpg");
    }

    #[test]
    fn duplicate_attachments_collapse_to_last_data() {
        let mut newer = attachment("a", 7);
        newer.description = Some("updated".into());
        let (state, _) = state_with(&[attachment("a", 0), attachment("b", 1), newer]);

        assert_eq!(state.len(), 2);
        assert_eq!(state.entries()[0].id, "a");
        assert_eq!(state.entries()[0].order_index, 7);
        assert_eq!(state.entries()[0].description, "updated");
    }

    #[test]
    fn add_appends_in_input_order() {
        let (mut state, registry) = state_with(&[attachment("a", 0)]);
        let added = state.add_many(vec![file("x.png"), file("y.png")]);

        assert!(state.is_dirty());
        assert_eq!(registry.live_count(), 2);
        let x = state.get(&added[0]).expect("x");
        let y = state.get(&added[1]).expect("y");
        assert_eq!((x.order_index, y.order_index), (1, 2));
        assert!(!x.is_remote());
        assert_eq!(x.pending_file().map(|f| f.name.as_str()), Some("x.png"));
    }

    #[test]
    fn add_then_remove_restores_content_and_releases_handle() {
        let (mut state, registry) = state_with(&[attachment("a", 0), attachment("b", 1)]);
        let before = state.entries().to_vec();

        let id = state.add(file("x.png"));
        assert!(state.remove(&id));

        assert_eq!(state.entries(), before.as_slice());
        assert_eq!(registry.created_count(), 1);
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn removing_unknown_id_is_a_no_op() {
        let (mut state, _) = state_with(&[attachment("a", 0)]);
        assert!(!state.remove("missing"));
        assert!(!state.is_dirty());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn update_description_marks_dirty() {
        let (mut state, _) = state_with(&[attachment("a", 0)]);
        state.update_description("a", "Sunset over the pool").expect("update");
        assert!(state.is_dirty());
        assert_eq!(state.get("a").map(|e| e.description.as_str()), Some("Sunset over the pool"));
        assert_eq!(
            state.update_description("nope", "x"),
            Err(EditError::UnknownEntry("nope".into()))
        );
    }

    #[test]
    fn move_entry_renumbers_render_order() {
        let (mut state, _) =
            state_with(&[attachment("A", 0), attachment("B", 1), attachment("C", 2)]);
        state.move_entry(0, 2).expect("move");

        let order: Vec<_> = state
            .displayed()
            .into_iter()
            .map(|e| (e.id.clone(), e.order_index))
            .collect();
        assert_eq!(
            order,
            vec![("B".to_string(), 0), ("C".to_string(), 1), ("A".to_string(), 2)]
        );
        assert!(state.is_dirty());
        assert!(state.move_entry(3, 0).is_err());
    }

    #[test]
    fn identical_reorder_still_marks_dirty() {
        let (mut state, _) = state_with(&[attachment("a", 0), attachment("b", 1)]);
        let same = state.entries().to_vec();
        state.reorder(same);
        assert!(state.is_dirty());
    }

    #[test]
    fn reorder_releases_dropped_pending_entries() {
        let (mut state, registry) = state_with(&[]);
        let keep = state.add(file("keep.png"));
        state.add(file("drop.png"));
        let only_keep: Vec<_> = state
            .entries()
            .iter()
            .filter(|e| e.id == keep)
            .cloned()
            .collect();

        state.reorder(only_keep);
        assert_eq!(state.len(), 1);
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn refresh_swaps_handles_without_leaking() {
        let (mut state, registry) = state_with(&[attachment("a", 0)]);
        let id = state.add(file("x.png"));
        let old_url = state.get(&id).map(|e| e.preview_url.clone()).expect("entry");

        state.refresh_preview_urls();
        state.refresh_preview_urls();

        let new_url = state.get(&id).map(|e| e.preview_url.clone()).expect("entry");
        assert_ne!(old_url, new_url);
        assert!(registry.is_live(&new_url));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.invalid_release_count(), 0);
        assert_eq!(state.get("a").map(|e| e.preview_url.as_str()), Some("attachment/a.jpg"));
    }

    #[test]
    fn reorder_with_stale_copies_keeps_current_handles() {
        let (mut state, registry) = state_with(&[]);
        let x = state.add(file("x.png"));
        let y = state.add(file("y.png"));
        let mut stale = state.entries().to_vec();
        stale.reverse();
        for (position, entry) in stale.iter_mut().enumerate() {
            entry.order_index = position as u32;
        }

        state.refresh_preview_urls();
        let current: Vec<String> = state.entries().iter().map(|e| e.preview_url.clone()).collect();
        state.reorder(stale);

        assert_eq!(ids(state.displayed()), vec![y, x]);
        for entry in state.entries() {
            assert!(current.contains(&entry.preview_url));
            assert!(registry.is_live(&entry.preview_url));
        }

        state.reset();
        assert_eq!(registry.created_count(), 4);
        assert_eq!(registry.released_count(), 4);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.invalid_release_count(), 0);
    }

    #[test]
    fn reorder_ignores_entries_it_does_not_hold() {
        let (mut state, registry) = state_with(&[attachment("a", 0)]);
        let mut outsider = state.get("a").cloned().expect("entry a");
        outsider.id = "outsider".into();
        outsider.preview_url = "blob:foreign".into();
        let mut ordered = vec![outsider];
        ordered.extend(state.entries().iter().cloned());

        state.reorder(ordered);

        assert_eq!(ids(state.displayed()), vec!["a"]);
        assert!(state.is_dirty());
        state.reset();
        assert_eq!(registry.invalid_release_count(), 0);
    }

    #[test]
    fn reset_restores_snapshot_and_releases_handles() {
        let (mut state, registry) = state_with(&[attachment("a", 0), attachment("b", 1)]);
        state.add(file("x.png"));
        state.remove("a");
        state.update_description("b", "changed").expect("update");

        state.reset();

        assert!(!state.is_dirty());
        assert_eq!(ids(state.displayed()), vec!["a", "b"]);
        assert_eq!(state.get("b").map(|e| e.description.as_str()), Some(""));
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.invalid_release_count(), 0);
    }

    #[test]
    fn drop_releases_outstanding_handles_once() {
        let registry = Arc::new(ObjectUrlRegistry::new());
        {
            let mut state = PropertyImageState::new(&[], registry.clone());
            state.add(file("x.png"));
            state.add(file("y.png"));
            state.teardown();
        }
        assert_eq!(registry.created_count(), 2);
        assert_eq!(registry.released_count(), 2);
        assert_eq!(registry.invalid_release_count(), 0);
    }

    #[test]
    fn promote_converts_pending_entry() {
        let (mut state, registry) = state_with(&[]);
        let id = state.add(file("x.png"));
        state.promote(&id, attachment("remote-x", 0));

        let entry = state.get("remote-x").expect("promoted");
        assert!(entry.is_remote());
        assert_eq!(entry.preview_url, "attachment/remote-x.jpg");
        assert_eq!(state.persisted().len(), 1);
        assert!(state.is_dirty());
        assert_eq!(registry.live_count(), 0);
    }
}
