use serde::{Deserialize, Serialize};

/// Broad category of a media file, decided from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed extension table. Extensions are matched lower-cased, without the dot.
const MEDIA_TYPES: &[(&str, &str, MediaKind)] = &[
    ("jpg", "image/jpeg", MediaKind::Image),
    ("jpeg", "image/jpeg", MediaKind::Image),
    ("png", "image/png", MediaKind::Image),
    ("gif", "image/gif", MediaKind::Image),
    ("webp", "image/webp", MediaKind::Image),
    ("bmp", "image/bmp", MediaKind::Image),
    ("mp3", "audio/mpeg", MediaKind::Audio),
    ("wav", "audio/wav", MediaKind::Audio),
    ("ogg", "audio/ogg", MediaKind::Audio),
    ("m4a", "audio/mp4", MediaKind::Audio),
    ("aac", "audio/aac", MediaKind::Audio),
    ("mp4", "video/mp4", MediaKind::Video),
    ("webm", "video/webm", MediaKind::Video),
    ("mov", "video/quicktime", MediaKind::Video),
    ("avi", "video/x-msvideo", MediaKind::Video),
    ("mkv", "video/x-matroska", MediaKind::Video),
];

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Lookup helpers over the fixed media extension table
pub struct MimeTable;

impl MimeTable {
    /// MIME type and kind for a filename, if its extension is a known media type
    pub fn lookup(filename: &str) -> Option<(&'static str, MediaKind)> {
        let ext = extension(filename)?;
        MEDIA_TYPES
            .iter()
            .find(|(candidate, _, _)| *candidate == ext)
            .map(|(_, mime, kind)| (*mime, *kind))
    }

    /// MIME type for a filename, falling back to `application/octet-stream`
    pub fn mime_for(filename: &str) -> &'static str {
        Self::lookup(filename).map_or(OCTET_STREAM, |(mime, _)| mime)
    }

    pub fn kind_for(filename: &str) -> Option<MediaKind> {
        Self::lookup(filename).map(|(_, kind)| kind)
    }

    /// Preferred file extension for a MIME type
    pub fn extension_for(mime: &str) -> Option<&'static str> {
        MEDIA_TYPES
            .iter()
            .find(|(_, candidate, _)| *candidate == mime)
            .map(|(ext, _, _)| *ext)
    }
}

/// Lower-cased extension of a filename, without the dot
pub fn extension(filename: &str) -> Option<String> {
    let base = base_name(filename);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Strip directory components (both `/` and `\` separators)
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(MimeTable::lookup("LION.JPG"), Some(("image/jpeg", MediaKind::Image)));
        assert_eq!(MimeTable::lookup("roar.Mp3"), Some(("audio/mpeg", MediaKind::Audio)));
        assert_eq!(MimeTable::lookup("clip.webm"), Some(("video/webm", MediaKind::Video)));
    }

    #[test]
    fn test_unknown_extensions() {
        assert_eq!(MimeTable::lookup("notes.txt"), None);
        assert_eq!(MimeTable::lookup("README"), None);
        assert_eq!(MimeTable::lookup(".hidden"), None);
        assert_eq!(MimeTable::mime_for("notes.txt"), OCTET_STREAM);
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("media/images/lion.jpg"), "lion.jpg");
        assert_eq!(base_name("media\\lion.jpg"), "lion.jpg");
        assert_eq!(base_name("lion.jpg"), "lion.jpg");
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(MimeTable::extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(MimeTable::extension_for("video/mp4"), Some("mp4"));
        assert_eq!(MimeTable::extension_for("text/plain"), None);
    }
}
