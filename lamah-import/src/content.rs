use std::collections::BTreeMap;

use async_trait::async_trait;
use lamah_blob::MediaRole;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    record::{Difficulty, ImportRecord},
    ContentError,
};

/// Document-database collaborator that persists imported questions
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create one question. `ContentError::Duplicate` marks a record the
    /// store already holds.
    async fn create_question(&self, question: NewQuestion) -> Result<CreatedRecord, ContentError>;
}

/// A question ready to be persisted, with uploaded media URLs attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub category_id: String,
    pub text: String,
    pub answer: String,
    pub answer2: Option<String>,
    pub difficulty: Difficulty,
    pub points: u32,
    pub options: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub answer_image_url: Option<String>,
    pub answer_image_url2: Option<String>,
    pub answer_audio_url: Option<String>,
    pub answer_video_url: Option<String>,
    /// Spreadsheet row the question came from
    pub source_row: usize,
}

impl NewQuestion {
    /// Build from a record and the URLs of its successfully uploaded media
    pub fn from_record<S: Into<String>>(
        record: &ImportRecord,
        category_id: S,
        urls: &BTreeMap<MediaRole, String>,
    ) -> Self {
        let url = |role: MediaRole| urls.get(&role).cloned();
        Self {
            category_id: category_id.into(),
            text: record.text.clone(),
            answer: record.answer.clone(),
            answer2: record.answer2.clone(),
            difficulty: record.difficulty,
            points: record.points,
            options: record.options.clone(),
            image_url: url(MediaRole::QuestionImage),
            audio_url: url(MediaRole::QuestionAudio),
            video_url: url(MediaRole::QuestionVideo),
            answer_image_url: url(MediaRole::AnswerImage),
            answer_image_url2: url(MediaRole::AnswerImage2),
            answer_audio_url: url(MediaRole::AnswerAudio),
            answer_video_url: url(MediaRole::AnswerVideo),
            source_row: record.row_number,
        }
    }

    /// Attached URL for a role
    pub fn media_url(&self, role: MediaRole) -> Option<&str> {
        match role {
            MediaRole::QuestionImage => self.image_url.as_deref(),
            MediaRole::QuestionAudio => self.audio_url.as_deref(),
            MediaRole::QuestionVideo => self.video_url.as_deref(),
            MediaRole::AnswerImage => self.answer_image_url.as_deref(),
            MediaRole::AnswerImage2 => self.answer_image_url2.as_deref(),
            MediaRole::AnswerAudio => self.answer_audio_url.as_deref(),
            MediaRole::AnswerVideo => self.answer_video_url.as_deref(),
            MediaRole::CategoryImage => None,
        }
    }
}

/// Identifier of a persisted question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}

impl CreatedRecord {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self { id: id.into() }
    }
}

/// In-memory content store; accepts everything
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    questions: Mutex<Vec<(String, NewQuestion)>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored questions in creation order
    pub async fn questions(&self) -> Vec<NewQuestion> {
        self.questions.lock().await.iter().map(|(_, q)| q.clone()).collect()
    }

    pub async fn get(&self, id: &str) -> Option<NewQuestion> {
        self.questions
            .lock()
            .await
            .iter()
            .find(|(stored, _)| stored == id)
            .map(|(_, q)| q.clone())
    }

    pub async fn len(&self) -> usize {
        self.questions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.questions.lock().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn create_question(&self, question: NewQuestion) -> Result<CreatedRecord, ContentError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.questions.lock().await.push((id.clone(), question));
        Ok(CreatedRecord::new(id))
    }
}
