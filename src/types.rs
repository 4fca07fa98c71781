use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of successful steals per team per round
pub const MAX_STEALS_PER_ROUND: u32 = 2;

/// Round name used for words that appear before any round header
pub const DEFAULT_ROUND_NAME: &str = "Round 1";

/// Position of a word in `GameState::words`
pub type WordIndex = usize;

/// A single word to guess, as produced by the CSV import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Word {
    pub word: String,
    /// Unparsed context text, kept alongside the derived fields
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub definition: String,
    /// Example usage pulled from quoted text in the context (empty if none)
    #[serde(default)]
    pub sentence: String,
    pub round: String,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Team {
    #[default]
    A,
    B,
}

impl Team {
    pub fn other(self) -> Self {
        match self {
            Team::A => Team::B,
            Team::B => Team::A,
        }
    }
}

/// Media attached to a word, either an external URL or an uploaded file path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MediaRef {
    Url(String),
    File(String),
}

/// Media keyed by word position.
///
/// Keys are positions, not word identities: replacing the word list leaves
/// these maps alone, so an entry may end up attached to a different word or
/// point past the end of the list.
pub type MediaMap = BTreeMap<WordIndex, MediaRef>;

/// The whole scoreboard, persisted as one record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameState {
    pub current_word_index: WordIndex,
    pub words: Vec<Word>,
    pub team_a_score: i64,
    pub team_b_score: i64,
    pub current_team: Team,
    pub current_round: Option<String>,
    pub steals_used_a: u32,
    pub steals_used_b: u32,
    /// Whether the display shows the word text (hidden by default)
    pub word_revealed: bool,
    pub bad_pp_mode: bool,
    pub word_images: MediaMap,
    pub word_audio: MediaMap,
    pub csv_url: Option<String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_word_index: 0,
            words: Vec::new(),
            team_a_score: 0,
            team_b_score: 0,
            current_team: Team::A,
            current_round: None,
            steals_used_a: 0,
            steals_used_b: 0,
            word_revealed: false,
            bad_pp_mode: false,
            word_images: MediaMap::new(),
            word_audio: MediaMap::new(),
            csv_url: None,
        }
    }
}

/// Outcome reported by the control device for the current word.
///
/// Anything other than `correct`/`incorrect` deserializes to `Other`,
/// which leaves the scoreboard untouched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkOutcome {
    Correct,
    Incorrect,
    #[default]
    #[serde(other)]
    Other,
}

/// Which media slot of a word is being set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot {
    Image,
    Audio,
}

impl MediaSlot {
    pub fn label(self) -> &'static str {
        match self {
            MediaSlot::Image => "image",
            MediaSlot::Audio => "audio",
        }
    }
}

/// Partial update of the allow-listed scoreboard fields.
///
/// Fields outside this struct (words, media, csv_url, current_round) cannot
/// be overwritten this way; unknown keys in the request are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateUpdate {
    pub current_word_index: Option<WordIndex>,
    pub team_a_score: Option<i64>,
    pub team_b_score: Option<i64>,
    pub current_team: Option<Team>,
    pub steals_used_a: Option<u32>,
    pub steals_used_b: Option<u32>,
    pub word_revealed: Option<bool>,
    pub bad_pp_mode: Option<bool>,
}

/// Request body for `POST /api/words`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadWordsRequest {
    pub csv_url: Option<String>,
    pub csv_file: Option<String>,
    /// Raw CSV text, for clients that already hold the sheet contents
    pub csv_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkResultRequest {
    #[serde(default)]
    pub result: Option<MarkOutcome>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StealRequest {
    pub team: Team,
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageUrlRequest {
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioUrlRequest {
    pub audio_url: Option<String>,
}
