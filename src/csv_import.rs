//! Turns a game-prep spreadsheet export into an ordered list of words.
//!
//! The sheet is loosely structured: round titles such as `Round 2 (5 pt)`
//! sit in the word column between the actual words, words may carry their
//! context after a `|`, and the context column mixes a definition with a
//! quoted example sentence. Rows inherit the most recently seen round and
//! point value, so the import is order-dependent and never rejects the
//! whole sheet because of one odd row.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{Word, DEFAULT_ROUND_NAME};

/// Cell values that are a repeated header line rather than data
const HEADER_TOKENS: &[&str] = &["word", "context", "sentence", "context/sentence"];

fn points_regex() -> &'static Regex {
    static POINTS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r"(?i)\((\d+)\s*pt\)").unwrap()
    });
    &POINTS_REGEX
}

fn quoted_regex() -> &'static Regex {
    static QUOTED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r#""([^"]+)""#).unwrap()
    });
    &QUOTED_REGEX
}

/// Columns holding the word and its context
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnLayout {
    word: usize,
    context: Option<usize>,
}

impl ColumnLayout {
    /// Locate the columns by (case-insensitive) header name, falling back to
    /// the first and second column.
    fn detect(headers: &csv::StringRecord) -> Option<Self> {
        if headers.is_empty() {
            return None;
        }

        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let word = lowered.iter().position(|h| h.contains("word"));
        let context = lowered
            .iter()
            .position(|h| h.contains("context") || h.contains("sentence"));

        Some(Self {
            word: word.unwrap_or(0),
            context: context.or_else(|| (headers.len() > 1).then_some(1)),
        })
    }
}

/// Whether a (trimmed) word cell announces a new round instead of a word.
///
/// Besides plain `Round N` titles this catches the censored and uncensored
/// spellings of the "F*** You" round.
pub fn is_round_header(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("round")
        || lower.contains("f***")
        || lower.contains("fuck")
        || (lower.starts_with('f') && lower.contains("you") && text.contains('('))
}

/// Point value from a header like `Round 2 (5 pt)`; 1 when absent or zero.
/// Values too large for `u32` are clamped.
pub fn parse_points(text: &str) -> u32 {
    points_regex()
        .captures(text)
        // digits only, so a parse error means overflow
        .map(|caps| caps[1].parse::<u32>().unwrap_or(u32::MAX))
        .filter(|points| *points >= 1)
        .unwrap_or(1)
}

/// Display name of a round header: everything before the first `(`
pub fn round_name(text: &str) -> &str {
    match text.split_once('(') {
        Some((before, _)) if !before.is_empty() => before.trim(),
        _ => text,
    }
}

/// Split a context cell into `(definition, sentence)`.
///
/// The first double-quoted span becomes the sentence; the text before it,
/// minus one trailing period, is the definition.
pub fn split_context(context: &str) -> (String, String) {
    let context = context.trim();
    match quoted_regex().captures(context) {
        Some(caps) => {
            let sentence = caps[1].trim().to_string();
            let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let before = context[..start].trim();
            let definition = before.strip_suffix('.').unwrap_or(before).trim();
            (definition.to_string(), sentence)
        }
        None => (context.to_string(), String::new()),
    }
}

/// Running round/points while scanning rows
struct RoundTracker {
    round: Option<String>,
    points: u32,
}

impl RoundTracker {
    fn new() -> Self {
        Self {
            round: None,
            points: 1,
        }
    }

    fn enter(&mut self, header: &str) {
        self.points = parse_points(header);
        self.round = Some(round_name(header).to_string());
        tracing::debug!(
            "Round header {:?} -> {:?} ({} pt)",
            header,
            self.round,
            self.points
        );
    }

    fn round(&self) -> String {
        self.round
            .clone()
            .unwrap_or_else(|| DEFAULT_ROUND_NAME.to_string())
    }
}

/// Parse raw CSV text (with a header line) into words, in row order.
///
/// Never fails: rows that cannot be read are skipped and logged.
pub fn normalize(raw: &str) -> Vec<Word> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(raw.as_bytes());

    let layout = match reader.headers() {
        Ok(headers) => match ColumnLayout::detect(headers) {
            Some(layout) => layout,
            None => return Vec::new(),
        },
        Err(e) => {
            tracing::warn!("Could not read CSV header: {}", e);
            return Vec::new();
        }
    };

    let mut tracker = RoundTracker::new();
    let mut words = Vec::new();

    for (row_no, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping unreadable CSV row {}: {}", row_no + 1, e);
                continue;
            }
        };

        let word_text = record.get(layout.word).unwrap_or("").trim();
        let context_text = layout
            .context
            .and_then(|col| record.get(col))
            .unwrap_or("")
            .trim();

        if word_text.is_empty() {
            continue;
        }
        if HEADER_TOKENS.contains(&word_text.to_lowercase().as_str()) {
            continue;
        }

        if is_round_header(word_text) {
            tracker.enter(word_text);
            continue;
        }

        let (word, context) = match word_text.split_once('|') {
            Some((left, right)) if context_text.is_empty() => (left.trim(), right.trim()),
            Some((left, _)) => (left.trim(), context_text),
            None => (word_text, context_text),
        };

        if word.is_empty() {
            tracing::debug!("Skipping CSV row {} with empty word before '|'", row_no + 1);
            continue;
        }

        let (definition, sentence) = split_context(context);

        words.push(Word {
            word: word.to_string(),
            context: context.to_string(),
            definition,
            sentence,
            round: tracker.round(),
            points: tracker.points,
        });
    }

    words
}
