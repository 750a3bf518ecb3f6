use std::collections::BTreeMap;

use lamah_blob::{mime::base_name, MediaRole};
use serde::{Deserialize, Serialize};

use crate::{
    aliases::{Field, FieldAliases, HeaderIndex},
    sheet::RawRow,
};

/// Question difficulty; decides the point value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a cell value; English, Arabic and numeric levels are accepted
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" | "سهل" | "1" => Some(Self::Easy),
            "medium" | "متوسط" | "2" => Some(Self::Medium),
            "hard" | "صعب" | "3" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Missing or unrecognized values fall back to medium
    pub fn normalize(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    pub fn points(&self) -> u32 {
        match self {
            Self::Easy => 200,
            Self::Medium => 400,
            Self::Hard => 600,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Media filenames referenced by a record, ordered by role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRefs(BTreeMap<MediaRole, String>);

impl MediaRefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the trimmed base name; blank values are ignored
    pub fn insert<S: AsRef<str>>(&mut self, role: MediaRole, filename: S) {
        let name = base_name(filename.as_ref().trim()).trim();
        if !name.is_empty() {
            self.0.insert(role, name.to_string());
        }
    }

    pub fn get(&self, role: MediaRole) -> Option<&str> {
        self.0.get(&role).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MediaRole, &str)> {
        self.0.iter().map(|(role, name)| (*role, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Why a row never reached upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropReason {
    MissingText,
    MissingAnswer,
    MissingTextAndAnswer,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::MissingText => "missing required field: question text",
            Self::MissingAnswer => "missing required field: answer",
            Self::MissingTextAndAnswer => "missing required fields: question text and answer",
        })
    }
}

/// One normalized spreadsheet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    /// Zero-based position among the sheet's data rows
    pub index: usize,
    pub row_number: usize,
    pub text: String,
    pub answer: String,
    pub answer2: Option<String>,
    pub difficulty: Difficulty,
    pub points: u32,
    /// Up to three wrong answers, in column order
    pub options: Option<Vec<String>>,
    pub media_refs: MediaRefs,
}

impl ImportRecord {
    /// Normalize a raw row, or say why it has to be dropped
    pub fn from_row(index: usize, row: &RawRow, headers: &HeaderIndex) -> Result<Self, DropReason> {
        let cells = &row.cells;
        let value = |field| FieldAliases::lookup(field, headers, cells);

        let text = value(Field::Text);
        let answer = value(Field::Answer);
        let (text, answer) = match (text, answer) {
            (Some(text), Some(answer)) => (text.to_string(), answer.to_string()),
            (None, Some(_)) => return Err(DropReason::MissingText),
            (Some(_), None) => return Err(DropReason::MissingAnswer),
            (None, None) => return Err(DropReason::MissingTextAndAnswer),
        };

        let difficulty = Difficulty::normalize(value(Field::Difficulty));
        let options: Vec<String> = Field::OPTIONS
            .iter()
            .filter_map(|field| value(*field))
            .map(str::to_string)
            .collect();

        let mut media_refs = MediaRefs::new();
        for role in MediaRole::IMPORT_ROLES {
            if let Some(filename) = value(Field::Media(role)) {
                media_refs.insert(role, filename);
            }
        }

        Ok(Self {
            index,
            row_number: row.row_number,
            text,
            answer,
            answer2: value(Field::Answer2).map(str::to_string),
            difficulty,
            points: difficulty.points(),
            options: if options.is_empty() { None } else { Some(options) },
            media_refs,
        })
    }
}
