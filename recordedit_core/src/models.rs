use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::AttachmentType;

/// Persisted attachment as cached from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub full_path: String,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub person_id: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order_index: u32,
}

impl Attachment {
    pub fn is_property_image(&self) -> bool {
        self.attachment_type == AttachmentType::PropertyImage
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Payload for creating an attachment after its bytes were uploaded.
///
/// The parent record is linked through a field named after the parent object
/// (`companyId`, `personId`, `propertyId`, ...), so it is flattened into the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDraft {
    pub name: String,
    pub full_path: String,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub created_at: String,
    pub order_index: u32,
    pub description: String,
    #[serde(flatten)]
    pub parent: Map<String, Value>,
}

impl AttachmentDraft {
    /// Parent link as `(fieldName, recordId)`, if any.
    pub fn parent_link(&self) -> Option<(&str, &str)> {
        self.parent
            .iter()
            .find_map(|(field, value)| value.as_str().map(|id| (field.as_str(), id)))
    }
}

/// Partial update applied to an existing attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttachmentPatch {
    pub fn is_empty(&self) -> bool {
        self.order_index.is_none() && self.description.is_none()
    }

    pub fn apply_to(&self, attachment: &mut Attachment) {
        if let Some(order_index) = self.order_index {
            attachment.order_index = order_index;
        }
        if let Some(description) = &self.description {
            attachment.description = Some(description.clone());
        }
    }
}

/// A local file staged for upload. Cloning shares the underlying bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Which record is being edited and who is editing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub object_name_singular: String,
    pub record_id: String,
    pub author_id: Option<String>,
}

impl EditTarget {
    pub fn new(object_name_singular: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            object_name_singular: object_name_singular.into(),
            record_id: record_id.into(),
            author_id: None,
        }
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    /// Name of the attachment field pointing back at this record, e.g. `companyId`.
    pub fn parent_field_name(&self) -> String {
        format!("{}Id", self.object_name_singular)
    }
}

/// Last known persisted state of the record under edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSnapshot {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl RecordSnapshot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Original value of a field; absent fields read as `null`.
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    pub fn property_images(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments.iter().filter(|a| a.is_property_image())
    }
}
