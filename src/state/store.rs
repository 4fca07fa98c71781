//! Persistence for the scoreboard record.
//!
//! Loading never fails: a missing, unreadable or corrupt record degrades to
//! a default scoreboard so the display keeps running mid-game.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::error::{GameError, GameResult};
use crate::types::GameState;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted scoreboard, or defaults if there is none usable
    async fn load(&self) -> GameState;

    /// Replace the persisted scoreboard wholesale
    async fn save(&self, state: &GameState) -> GameResult<()>;
}

/// Stores the scoreboard as pretty-printed JSON in a single file
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> GameState {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No state file at {}, using defaults", self.path.display());
                return GameState::default();
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to read state file {}: {}. Using defaults.",
                    self.path.display(),
                    e
                );
                return GameState::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "State file {} is corrupt ({}). Using defaults.",
                    self.path.display(),
                    e
                );
                GameState::default()
            }
        }
    }

    async fn save(&self, state: &GameState) -> GameResult<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| GameError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| GameError::Storage(e.to_string()))?;
        }

        // Write then rename so a crash never leaves a half-written record
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| GameError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| GameError::Storage(e.to_string()))
    }
}

/// Keeps the scoreboard in memory only
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<Option<GameState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: GameState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> GameState {
        self.state.read().await.clone().unwrap_or_default()
    }

    async fn save(&self, state: &GameState) -> GameResult<()> {
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaRef, Team, Word};

    fn sample_state() -> GameState {
        let mut state = GameState::default();
        state.load_words(vec![Word {
            word: "Apple".to_string(),
            context: "A red fruit".to_string(),
            definition: "A red fruit".to_string(),
            sentence: String::new(),
            round: "Round 2".to_string(),
            points: 5,
        }]);
        state.team_b_score = 5;
        state.current_team = Team::B;
        state
            .word_images
            .insert(0, MediaRef::File("static/uploads/image_0_1.png".to_string()));
        state
    }

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await, GameState::default());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.load().await, GameState::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("state.json"));
        let state = sample_state();

        store.save(&state).await.unwrap();
        assert_eq!(store.load().await, state);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_reads_original_state_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let raw = r#"{
            "current_word_index": 0,
            "words": [{"word": "Apple", "context": "", "definition": "", "sentence": "",
                       "round": "Round 1", "points": 1}],
            "team_a_score": 3,
            "team_b_score": 0,
            "current_team": "B",
            "current_round": "Round 1",
            "steals_used_a": 1,
            "steals_used_b": 0,
            "word_revealed": true,
            "bad_pp_mode": false,
            "word_images": {"0": {"type": "url", "value": "https://x/a.png"}},
            "word_audio": {},
            "csv_url": null
        }"#;
        tokio::fs::write(&path, raw).await.unwrap();

        let state = JsonFileStore::new(&path).load().await;
        assert_eq!(state.team_a_score, 3);
        assert_eq!(state.current_team, Team::B);
        assert_eq!(state.steals_used_a, 1);
        assert_eq!(
            state.word_images.get(&0),
            Some(&MediaRef::Url("https://x/a.png".to_string()))
        );
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.load().await, GameState::default());

        let state = sample_state();
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await, state);
    }
}
