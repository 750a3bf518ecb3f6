use std::collections::HashMap;

use lamah_blob::MediaRole;

/// Logical column of an import spreadsheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Text,
    Answer,
    Answer2,
    Difficulty,
    Option1,
    Option2,
    Option3,
    Media(MediaRole),
}

impl Field {
    /// Wrong-answer columns in order
    pub const OPTIONS: [Field; 3] = [Field::Option1, Field::Option2, Field::Option3];
}

/// Ordered header aliases per field. Entries are lower-case; the first
/// alias with a non-empty cell wins.
pub struct FieldAliases;

impl FieldAliases {
    pub fn aliases(field: Field) -> &'static [&'static str] {
        match field {
            Field::Text => &["text", "question", "question text", "questiontext", "السؤال", "نص السؤال", "سؤال"],
            Field::Answer => &[
                "answer",
                "correct answer",
                "correctanswer",
                "الإجابة",
                "الاجابة",
                "الجواب",
                "الإجابة الصحيحة",
            ],
            Field::Answer2 => &[
                "answer2",
                "answer 2",
                "second answer",
                "الإجابة 2",
                "الإجابة الثانية",
                "الجواب 2",
            ],
            Field::Difficulty => &["difficulty", "level", "الصعوبة", "المستوى", "مستوى الصعوبة"],
            Field::Option1 => &["option1", "option 1", "wrong1", "wrong answer 1", "الخيار 1", "خيار 1", "الخيار الأول"],
            Field::Option2 => &["option2", "option 2", "wrong2", "wrong answer 2", "الخيار 2", "خيار 2", "الخيار الثاني"],
            Field::Option3 => &["option3", "option 3", "wrong3", "wrong answer 3", "الخيار 3", "خيار 3", "الخيار الثالث"],
            Field::Media(role) => media_aliases(role),
        }
    }

    /// First non-empty trimmed value among the field's aliases
    pub fn lookup<'a>(field: Field, headers: &HeaderIndex, cells: &'a [String]) -> Option<&'a str> {
        Self::aliases(field)
            .iter()
            .filter_map(|alias| headers.column(alias))
            .filter_map(|column| cells.get(column))
            .map(|cell| cell.trim())
            .find(|value| !value.is_empty())
    }
}

fn media_aliases(role: MediaRole) -> &'static [&'static str] {
    match role {
        MediaRole::QuestionImage => &["questionimage", "question image", "image", "صورة السؤال", "صورة"],
        MediaRole::QuestionAudio => &["questionaudio", "question audio", "audio", "صوت السؤال", "صوت"],
        MediaRole::QuestionVideo => &["questionvideo", "question video", "video", "فيديو السؤال", "فيديو"],
        MediaRole::AnswerImage => &["answerimage", "answer image", "صورة الإجابة", "صورة الجواب"],
        MediaRole::AnswerImage2 => &["answerimage2", "answer image 2", "صورة الإجابة 2", "صورة الإجابة الثانية"],
        MediaRole::AnswerAudio => &["answeraudio", "answer audio", "صوت الإجابة", "صوت الجواب"],
        MediaRole::AnswerVideo => &["answervideo", "answer video", "فيديو الإجابة", "فيديو الجواب"],
        MediaRole::CategoryImage => &["categoryimage", "category image", "صورة الفئة"],
    }
}

/// Normalized header text → column position (first occurrence wins)
#[derive(Debug, Clone, Default)]
pub struct HeaderIndex {
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &[String]) -> Self {
        let mut columns = HashMap::new();
        for (position, header) in headers.iter().enumerate() {
            let key = normalize_header(header);
            if !key.is_empty() {
                columns.entry(key).or_insert(position);
            }
        }
        Self { columns }
    }

    pub fn column(&self, alias: &str) -> Option<usize> {
        self.columns.get(alias).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Trim, lower-case and collapse inner whitespace
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
