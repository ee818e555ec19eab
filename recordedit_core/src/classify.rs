use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Type tag carried by every stored attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttachmentType {
    Archive,
    Audio,
    Image,
    Presentation,
    Spreadsheet,
    TextDocument,
    Video,
    Other,
    PropertyImage,
    PropertyDocument,
    PropertyVideo,
    PropertyDocumentation,
    // Older records were written with a misspelled tag.
    #[serde(alias = "PorpertyFlyer")]
    PropertyFlyer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentIcon {
    File,
    FileText,
    FileZip,
    FileDescription,
    Headphones,
    Photo,
    Presentation,
    Table,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconColor {
    Gray,
    Yellow,
    Blue,
    Purple,
    Turquoise,
    Orange,
}

impl AttachmentType {
    pub const ALL: [AttachmentType; 13] = [
        AttachmentType::Archive,
        AttachmentType::Audio,
        AttachmentType::Image,
        AttachmentType::Presentation,
        AttachmentType::Spreadsheet,
        AttachmentType::TextDocument,
        AttachmentType::Video,
        AttachmentType::Other,
        AttachmentType::PropertyImage,
        AttachmentType::PropertyDocument,
        AttachmentType::PropertyVideo,
        AttachmentType::PropertyDocumentation,
        AttachmentType::PropertyFlyer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentType::Archive => "Archive",
            AttachmentType::Audio => "Audio",
            AttachmentType::Image => "Image",
            AttachmentType::Presentation => "Presentation",
            AttachmentType::Spreadsheet => "Spreadsheet",
            AttachmentType::TextDocument => "TextDocument",
            AttachmentType::Video => "Video",
            AttachmentType::Other => "Other",
            AttachmentType::PropertyImage => "PropertyImage",
            AttachmentType::PropertyDocument => "PropertyDocument",
            AttachmentType::PropertyVideo => "PropertyVideo",
            AttachmentType::PropertyDocumentation => "PropertyDocumentation",
            AttachmentType::PropertyFlyer => "PropertyFlyer",
        }
    }

    pub fn is_property_type(&self) -> bool {
        matches!(
            self,
            AttachmentType::PropertyImage
                | AttachmentType::PropertyDocument
                | AttachmentType::PropertyVideo
                | AttachmentType::PropertyDocumentation
                | AttachmentType::PropertyFlyer
        )
    }

    pub fn icon(&self) -> AttachmentIcon {
        match self {
            AttachmentType::Archive => AttachmentIcon::FileZip,
            AttachmentType::Audio => AttachmentIcon::Headphones,
            AttachmentType::Image => AttachmentIcon::Photo,
            AttachmentType::Presentation => AttachmentIcon::Presentation,
            AttachmentType::Spreadsheet => AttachmentIcon::Table,
            AttachmentType::TextDocument => AttachmentIcon::FileText,
            AttachmentType::Video => AttachmentIcon::Video,
            AttachmentType::Other => AttachmentIcon::File,
            AttachmentType::PropertyImage => AttachmentIcon::Photo,
            AttachmentType::PropertyDocument => AttachmentIcon::File,
            AttachmentType::PropertyVideo => AttachmentIcon::Video,
            AttachmentType::PropertyDocumentation => AttachmentIcon::FileText,
            AttachmentType::PropertyFlyer => AttachmentIcon::FileDescription,
        }
    }

    pub fn color(&self) -> IconColor {
        match self {
            AttachmentType::Archive
            | AttachmentType::Audio
            | AttachmentType::Image
            | AttachmentType::Presentation
            | AttachmentType::Spreadsheet
            | AttachmentType::TextDocument
            | AttachmentType::Video
            | AttachmentType::Other => IconColor::Gray,
            AttachmentType::PropertyImage => IconColor::Yellow,
            AttachmentType::PropertyDocument => IconColor::Blue,
            AttachmentType::PropertyVideo => IconColor::Purple,
            AttachmentType::PropertyDocumentation => IconColor::Turquoise,
            AttachmentType::PropertyFlyer => IconColor::Orange,
        }
    }

    /// Guesses a generic type from the file extension. Never yields a property type.
    pub fn from_file_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        let Some(extension) = extension else {
            return AttachmentType::Other;
        };

        match extension.as_str() {
            "zip" | "rar" | "7z" | "tar" | "gz" | "tgz" | "bz2" | "xz" => AttachmentType::Archive,
            "mp3" | "wav" | "ogg" | "flac" | "m4a" | "aac" => AttachmentType::Audio,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "bmp" | "heic" | "tif" | "tiff" => {
                AttachmentType::Image
            }
            "ppt" | "pptx" | "key" | "odp" => AttachmentType::Presentation,
            "xls" | "xlsx" | "xlsm" | "csv" | "tsv" | "ods" | "numbers" => {
                AttachmentType::Spreadsheet
            }
            "doc" | "docx" | "txt" | "pdf" | "md" | "rtf" | "odt" | "pages" => {
                AttachmentType::TextDocument
            }
            "mp4" | "mov" | "avi" | "mkv" | "webm" | "m4v" | "wmv" => AttachmentType::Video,
            _ => AttachmentType::Other,
        }
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_types_are_gray() {
        for kind in AttachmentType::ALL {
            if !kind.is_property_type() {
                assert_eq!(kind.color(), IconColor::Gray, "{kind}");
            }
        }
    }

    #[test]
    fn property_types_have_distinct_colors() {
        let colors: std::collections::HashSet<_> = AttachmentType::ALL
            .iter()
            .filter(|kind| kind.is_property_type())
            .map(|kind| kind.color())
            .collect();
        assert_eq!(colors.len(), 5);
        assert_eq!(AttachmentType::PropertyImage.color(), IconColor::Yellow);
        assert_eq!(AttachmentType::PropertyImage.icon(), AttachmentIcon::Photo);
        assert_eq!(
            AttachmentType::PropertyFlyer.icon(),
            AttachmentIcon::FileDescription
        );
    }

    #[test]
    fn legacy_flyer_tag_is_accepted() {
        let parsed: AttachmentType = serde_json::from_str("\"PorpertyFlyer\"").expect("parse");
        assert_eq!(parsed, AttachmentType::PropertyFlyer);
        assert_eq!(
            serde_json::to_string(&parsed).expect("serialize"),
            "\"PropertyFlyer\""
        );
    }

    #[test]
    fn infers_type_from_extension() {
        assert_eq!(AttachmentType::from_file_name("photo.JPG"), AttachmentType::Image);
        assert_eq!(AttachmentType::from_file_name("deck.pptx"), AttachmentType::Presentation);
        assert_eq!(AttachmentType::from_file_name("backup.tar"), AttachmentType::Archive);
        assert_eq!(AttachmentType::from_file_name("notes.pdf"), AttachmentType::TextDocument);
        assert_eq!(AttachmentType::from_file_name("README"), AttachmentType::Other);
        assert_eq!(AttachmentType::from_file_name("blob.xyz"), AttachmentType::Other);
    }
}
