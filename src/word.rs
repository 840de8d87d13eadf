use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type WordId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingType {
    Introduction,
    Isolation,
    Question,
    Sentence,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    pub url: String,
    pub recording_type: RecordingType,
}

/// A vocabulary entry as delivered by the word source. Read-only for the
/// whole session; identity is `id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub title: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub audio_files: Vec<AudioFile>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub grammatical_gender: Option<String>,
}

impl Word {
    pub fn new(id: WordId, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            translation: None,
            audio: None,
            audio_files: Vec::new(),
            image: None,
            part_of_speech: None,
            grammatical_gender: None,
        }
    }

    /// First recording matching the priority list, falling back to the plain
    /// `audio` url.
    pub fn best_audio(&self, priorities: &[RecordingType]) -> Option<&str> {
        priorities
            .iter()
            .find_map(|kind| {
                self.audio_files
                    .iter()
                    .find(|f| f.recording_type == *kind)
                    .map(|f| f.url.as_str())
            })
            .or(self.audio.as_deref())
    }

    pub fn audio_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.audio_files.iter().map(|f| f.url.as_str()).collect();
        if let Some(audio) = self.audio.as_deref() {
            if !urls.contains(&audio) {
                urls.push(audio);
            }
        }
        urls
    }

    /// Text shown on an answer card.
    pub fn label(&self) -> &str {
        self.translation.as_deref().unwrap_or(&self.title)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Audio,
    Image,
    Text,
}

impl DisplayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Audio => "audio",
            DisplayMode::Image => "image",
            DisplayMode::Text => "text",
        }
    }

    pub fn needs_image(self) -> bool {
        matches!(self, DisplayMode::Image)
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(DisplayMode::Audio),
            "image" => Ok(DisplayMode::Image),
            "text" => Ok(DisplayMode::Text),
            other => Err(format!("unknown display mode: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub words: Vec<Word>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordSet {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
}

const SAMPLE_WORD_SET: &str = include_str!("../assets/sample-wordset.json");

impl WordSet {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn sample() -> Self {
        Self::from_json(SAMPLE_WORD_SET).unwrap_or_else(|_| WordSet {
            name: "empty".to_string(),
            categories: Vec::new(),
        })
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_with_files() -> Word {
        let mut word = Word::new(1, "gato");
        word.audio = Some("plain.mp3".to_string());
        word.audio_files = vec![
            AudioFile {
                url: "iso.mp3".to_string(),
                recording_type: RecordingType::Isolation,
            },
            AudioFile {
                url: "intro.mp3".to_string(),
                recording_type: RecordingType::Introduction,
            },
        ];
        word
    }

    #[test]
    fn test_best_audio_respects_priority() {
        let word = word_with_files();
        assert_eq!(
            word.best_audio(&[RecordingType::Introduction, RecordingType::Isolation]),
            Some("intro.mp3")
        );
        assert_eq!(
            word.best_audio(&[RecordingType::Question, RecordingType::Isolation]),
            Some("iso.mp3")
        );
    }

    #[test]
    fn test_best_audio_falls_back_to_plain_audio() {
        let word = word_with_files();
        assert_eq!(word.best_audio(&[RecordingType::Sentence]), Some("plain.mp3"));
        assert_eq!(Word::new(2, "perro").best_audio(&[RecordingType::Question]), None);
    }

    #[test]
    fn test_unknown_recording_type_deserializes_as_other() {
        let json = r#"{"url": "x.mp3", "recording_type": "whisper"}"#;
        let file: AudioFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.recording_type, RecordingType::Other);
    }

    #[test]
    fn test_sample_word_set_loads() {
        let set = WordSet::sample();
        assert!(!set.categories.is_empty());
        assert!(set.categories.iter().all(|c| !c.words.is_empty()));
    }

    #[test]
    fn test_display_mode_parse() {
        assert_eq!("text".parse::<DisplayMode>(), Ok(DisplayMode::Text));
        assert!("video".parse::<DisplayMode>().is_err());
    }
}
