use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::mime::{base_name, MediaKind, MimeTable, OCTET_STREAM};

/// Logical purpose of a media reference on a question or category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaRole {
    QuestionImage,
    QuestionAudio,
    QuestionVideo,
    AnswerImage,
    AnswerImage2,
    AnswerAudio,
    AnswerVideo,
    /// Category thumbnail, uploaded by the admin forms rather than the importer
    CategoryImage,
}

impl MediaRole {
    /// Roles a spreadsheet row may reference, in column order
    pub const IMPORT_ROLES: [MediaRole; 7] = [
        MediaRole::QuestionImage,
        MediaRole::QuestionAudio,
        MediaRole::QuestionVideo,
        MediaRole::AnswerImage,
        MediaRole::AnswerImage2,
        MediaRole::AnswerAudio,
        MediaRole::AnswerVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QuestionImage => "questionImage",
            Self::QuestionAudio => "questionAudio",
            Self::QuestionVideo => "questionVideo",
            Self::AnswerImage => "answerImage",
            Self::AnswerImage2 => "answerImage2",
            Self::AnswerAudio => "answerAudio",
            Self::AnswerVideo => "answerVideo",
            Self::CategoryImage => "categoryImage",
        }
    }

    /// Prefix used for generated storage filenames
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::QuestionImage => "q_img",
            Self::QuestionAudio => "q_aud",
            Self::QuestionVideo => "q_vid",
            Self::AnswerImage => "a_img",
            Self::AnswerImage2 => "a_img2",
            Self::AnswerAudio => "a_aud",
            Self::AnswerVideo => "a_vid",
            Self::CategoryImage => "cat",
        }
    }

    /// Whether images for this role are cropped to a fixed thumbnail box
    pub fn is_thumbnail(&self) -> bool {
        matches!(self, Self::CategoryImage)
    }
}

impl std::fmt::Display for MediaRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extracted media file, keyed by its base filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub filename: String,
    pub mime_type: String,
    pub kind: Option<MediaKind>,
    pub data: Bytes,
}

impl MediaAsset {
    /// Build an asset, stripping directories from the name and inferring
    /// the MIME type from the extension
    pub fn new<S: AsRef<str>, B: Into<Bytes>>(filename: S, data: B) -> Self {
        let filename = base_name(filename.as_ref()).to_string();
        let (mime_type, kind) = match MimeTable::lookup(&filename) {
            Some((mime, kind)) => (mime.to_string(), Some(kind)),
            None => (OCTET_STREAM.to_string(), None),
        };
        Self {
            filename,
            mime_type,
            kind,
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_image(&self) -> bool {
        self.kind == Some(MediaKind::Image)
    }

    pub fn is_audio_or_video(&self) -> bool {
        matches!(self.kind, Some(MediaKind::Audio) | Some(MediaKind::Video))
    }
}

/// Caller credential presented to the control plane
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// `Authorization: Bearer <token>` for signed-in admins
    Bearer(String),
    /// `X-Invite-Code: <code>` for the unauthenticated contributor flow
    InviteCode(String),
}

impl Credential {
    pub const INVITE_CODE_HEADER: &'static str = "X-Invite-Code";

    pub fn bearer<S: Into<String>>(token: S) -> Self {
        Self::Bearer(token.into())
    }

    pub fn invite_code<S: Into<String>>(code: S) -> Self {
        Self::InviteCode(code.into())
    }

    /// Header name and value carrying this credential
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Self::Bearer(token) => ("Authorization", format!("Bearer {}", token)),
            Self::InviteCode(code) => (Self::INVITE_CODE_HEADER, code.clone()),
        }
    }

    /// Apply the credential header to an outgoing request
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token),
            Self::InviteCode(code) => request.header(Self::INVITE_CODE_HEADER, code),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::InviteCode(_) => f.write_str("InviteCode(<redacted>)"),
        }
    }
}

/// Who is uploading and on behalf of which record
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub credential: Credential,
    pub record_index: Option<usize>,
    pub category_id: Option<String>,
}

impl RecordContext {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            record_index: None,
            category_id: None,
        }
    }

    pub fn with_record_index(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category_id: S) -> Self {
        self.category_id = Some(category_id.into());
        self
    }
}
