mod game;
pub mod media;
pub mod store;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::csv_import;
use crate::error::{GameError, GameResult};
use crate::source::{ContentSource, FileSource, HttpSource, WordSource};
use crate::types::*;

use media::{LocalMediaStorage, MediaStorage};
use store::StateStore;

/// Shared application state.
///
/// The scoreboard lives in the store; every operation loads the whole
/// record, changes it and writes it back. Writers are serialized by
/// `write_guard`, so concurrent requests never interleave a
/// read-modify-write, but the last write still wins.
pub struct AppState {
    pub config: AppConfig,
    store: Arc<dyn StateStore>,
    url_source: Arc<dyn ContentSource>,
    file_source: Arc<dyn ContentSource>,
    media: Arc<dyn MediaStorage>,
    write_guard: Mutex<()>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn StateStore>) -> Self {
        let url_source = Arc::new(HttpSource::new(config.fetch_timeout));
        let media = Arc::new(LocalMediaStorage::new(
            config.upload_dir.clone(),
            config.upload_public_prefix(),
        ));

        Self {
            config,
            store,
            url_source,
            file_source: Arc::new(FileSource),
            media,
            write_guard: Mutex::new(()),
        }
    }

    pub fn with_url_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.url_source = source;
        self
    }

    pub fn with_file_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.file_source = source;
        self
    }

    pub fn with_media_storage(mut self, media: Arc<dyn MediaStorage>) -> Self {
        self.media = media;
        self
    }

    /// Current scoreboard (defaults if nothing usable is persisted)
    pub async fn get_state(&self) -> GameState {
        self.store.load().await
    }

    /// Load, mutate and save the scoreboard under the write guard.
    ///
    /// If `f` fails nothing is saved.
    pub async fn transact<T, F>(&self, f: F) -> GameResult<(GameState, T)>
    where
        F: FnOnce(&mut GameState) -> GameResult<T>,
    {
        let _guard = self.write_guard.lock().await;
        let mut state = self.store.load().await;
        let out = f(&mut state)?;
        self.store.save(&state).await?;
        Ok((state, out))
    }

    /// Fetch and parse the words behind `source` without touching the scoreboard
    pub async fn read_words(&self, source: &WordSource) -> GameResult<Vec<Word>> {
        let raw = match source {
            WordSource::Url(url) => {
                tracing::info!("Fetching words via {} from {}", self.url_source.name(), url);
                self.url_source.fetch_text(url).await?
            }
            WordSource::File(path) => {
                self.file_source
                    .fetch_text(&path.to_string_lossy())
                    .await?
            }
            WordSource::Inline(text) => text.clone(),
            WordSource::Sample => {
                let sample = &self.config.sample_csv;
                if !tokio::fs::try_exists(sample).await.unwrap_or(false) {
                    return Err(GameError::InvalidInput(
                        "No CSV source provided".to_string(),
                    ));
                }
                self.file_source
                    .fetch_text(&sample.to_string_lossy())
                    .await?
            }
        };

        Ok(csv_import::normalize(&raw))
    }

    /// Replace the word list from `source`. A URL source is remembered in
    /// `csv_url` for later reloads.
    pub async fn load_words(&self, source: WordSource) -> GameResult<GameState> {
        let words = self.read_words(&source).await?;
        let count = words.len();

        let (state, ()) = self
            .transact(|state| {
                if let WordSource::Url(url) = &source {
                    state.csv_url = Some(url.clone());
                }
                state.load_words(words);
                Ok(())
            })
            .await?;

        tracing::info!("Loaded {} words from {:?}", count, source);
        Ok(state)
    }

    /// Load the sample sheet if no words are loaded yet.
    /// Returns the number of words loaded, or `None` if nothing was done.
    pub async fn auto_load_sample(&self) -> GameResult<Option<usize>> {
        if !self.get_state().await.words.is_empty() {
            return Ok(None);
        }
        if !tokio::fs::try_exists(&self.config.sample_csv)
            .await
            .unwrap_or(false)
        {
            return Ok(None);
        }

        let words = self.read_words(&WordSource::Sample).await?;
        let (state, ()) = self
            .transact(|state| {
                // Another writer may have loaded words since the check above
                if state.words.is_empty() {
                    state.load_words(words);
                }
                Ok(())
            })
            .await?;
        Ok(Some(state.words.len()))
    }

    pub async fn set_fields(&self, update: StateUpdate) -> GameResult<GameState> {
        let (state, ()) = self
            .transact(|state| {
                state.apply_update(update);
                Ok(())
            })
            .await?;
        Ok(state)
    }

    /// Attach a media URL to a word
    pub async fn set_media_url(
        &self,
        slot: MediaSlot,
        index: WordIndex,
        url: Option<String>,
    ) -> GameResult<GameState> {
        let (state, ()) = self
            .transact(|state| {
                state.check_index(index)?;
                let url = url.filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                    GameError::InvalidInput(format!("No {} URL provided", slot.label()))
                })?;
                state.set_media(slot, index, MediaRef::Url(url))
            })
            .await?;

        tracing::debug!("Set {} URL for word {}", slot.label(), index);
        Ok(state)
    }

    /// Store an uploaded file and attach it to a word.
    /// Returns the new scoreboard and the stored file's relative path.
    pub async fn upload_media(
        &self,
        slot: MediaSlot,
        index: WordIndex,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> GameResult<(GameState, String)> {
        self.get_state().await.check_index(index)?;

        let file_name =
            file_name.ok_or_else(|| GameError::InvalidInput("No file provided".to_string()))?;
        if file_name.is_empty() {
            return Err(GameError::InvalidInput("No file selected".to_string()));
        }
        let ext = media::validated_extension(slot, file_name)?;

        let stored_name = media::upload_file_name(slot, index, &ext);
        let path = self.media.store(&stored_name, bytes).await?;

        // The word list may have changed while the bytes were being written
        match self
            .transact(|state| state.set_media(slot, index, MediaRef::File(path.clone())))
            .await
        {
            Ok((state, ())) => Ok((state, path)),
            Err(e) => {
                self.media.discard(&stored_name).await;
                Err(e)
            }
        }
    }

    pub async fn mark_result(&self, outcome: MarkOutcome) -> GameResult<GameState> {
        let (state, ()) = self.transact(|state| state.mark_result(outcome)).await?;
        tracing::debug!(
            "Marked {:?}: A={} B={}",
            outcome,
            state.team_a_score,
            state.team_b_score
        );
        Ok(state)
    }

    pub async fn steal(&self, team: Team, success: bool) -> GameResult<GameState> {
        let (state, ()) = self.transact(|state| state.steal(team, success)).await?;
        tracing::info!(
            "Team {:?} steal {} ({} used)",
            team,
            if success { "succeeded" } else { "failed" },
            state.steals_used(team)
        );
        Ok(state)
    }

    pub async fn start_round(&self) -> GameResult<GameState> {
        let (state, ()) = self
            .transact(|state| {
                state.start_round();
                Ok(())
            })
            .await?;
        Ok(state)
    }

    pub async fn reset(&self) -> GameResult<GameState> {
        let (state, ()) = self
            .transact(|state| {
                *state = state.reset();
                Ok(())
            })
            .await?;
        tracing::info!("Game reset ({} words kept)", state.words.len());
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use super::store::MemoryStore;

    const SHEET: &str = "Word,Context\n\
                         Apple,A red fruit\n\
                         Round 2 (3 pt),\n\
                         Study,\"Learn things. \"\"She studies.\"\"\"\n";

    struct FixedSource(GameResult<String>);

    #[async_trait]
    impl ContentSource for FixedSource {
        async fn fetch_text(&self, _locator: &str) -> GameResult<String> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn test_state() -> AppState {
        let dir = std::env::temp_dir().join("scoreboard-test-missing");
        let config = AppConfig {
            sample_csv: dir.join("sample_words.csv"),
            upload_dir: dir.join("uploads"),
            ..AppConfig::default()
        };
        AppState::new(config, Arc::new(MemoryStore::new()))
            .with_url_source(Arc::new(FixedSource(Ok(SHEET.to_string()))))
    }

    #[tokio::test]
    async fn test_load_words_from_url_records_url() {
        let state = test_state();
        let game = state
            .load_words(WordSource::Url("https://example.com/sheet.csv".to_string()))
            .await
            .unwrap();

        assert_eq!(game.words.len(), 2);
        assert_eq!(game.csv_url.as_deref(), Some("https://example.com/sheet.csv"));
        assert_eq!(game.current_round.as_deref(), Some("Round 1"));
        assert_eq!(state.get_state().await, game);
    }

    #[tokio::test]
    async fn test_load_words_from_file_keeps_csv_url() {
        let state = test_state()
            .with_file_source(Arc::new(FixedSource(Ok("Word\nPear\nPlum\n".to_string()))));
        state
            .load_words(WordSource::Url("https://example.com/a.csv".to_string()))
            .await
            .unwrap();

        let game = state
            .load_words(WordSource::File("words.csv".into()))
            .await
            .unwrap();
        let words: Vec<_> = game.words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, vec!["Pear", "Plum"]);
        assert_eq!(game.csv_url.as_deref(), Some("https://example.com/a.csv"));
    }

    #[tokio::test]
    async fn test_inline_source_keeps_csv_url() {
        let state = test_state();
        state
            .load_words(WordSource::Url("https://example.com/a.csv".to_string()))
            .await
            .unwrap();

        let game = state
            .load_words(WordSource::Inline("Word\nPear\n".to_string()))
            .await
            .unwrap();
        assert_eq!(game.words.len(), 1);
        assert_eq!(game.csv_url.as_deref(), Some("https://example.com/a.csv"));
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state() {
        let state = test_state().with_url_source(Arc::new(FixedSource(Err(
            GameError::SourceUnavailable("Failed to load CSV from URL: timed out".to_string()),
        ))));

        let err = state
            .load_words(WordSource::Url("https://example.com/down.csv".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::SourceUnavailable(ref msg) if msg.contains("timed out")));
        assert_eq!(state.get_state().await, GameState::default());
    }

    #[tokio::test]
    async fn test_missing_sample_is_invalid_input() {
        let state = test_state();
        let err = state.load_words(WordSource::Sample).await.unwrap_err();
        assert_eq!(err, GameError::InvalidInput("No CSV source provided".to_string()));
        assert_eq!(state.auto_load_sample().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_auto_load_sample() {
        let dir = tempfile::tempdir().unwrap();
        let sample = dir.path().join("sample_words.csv");
        tokio::fs::write(&sample, SHEET).await.unwrap();

        let config = AppConfig {
            sample_csv: sample,
            ..AppConfig::default()
        };
        let state = AppState::new(config, Arc::new(MemoryStore::new()));

        assert_eq!(state.auto_load_sample().await.unwrap(), Some(2));
        // Already loaded: nothing to do
        assert_eq!(state.auto_load_sample().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_transition_is_not_saved() {
        let mut seeded = GameState::default();
        seeded.load_words(csv_import::normalize(SHEET));
        seeded.steals_used_a = MAX_STEALS_PER_ROUND;
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryStore::with_state(seeded.clone())),
        );

        let before = state.get_state().await;
        assert_eq!(before, seeded);
        assert_eq!(
            state.steal(Team::A, true).await,
            Err(GameError::StealLimitExceeded)
        );
        assert_eq!(state.get_state().await, before);
    }

    #[tokio::test]
    async fn test_set_media_url_requires_url_and_index() {
        let state = test_state();
        state
            .load_words(WordSource::Url("u".to_string()))
            .await
            .unwrap();

        assert_eq!(
            state.set_media_url(MediaSlot::Image, 0, None).await,
            Err(GameError::InvalidInput("No image URL provided".to_string()))
        );
        assert_eq!(
            state
                .set_media_url(MediaSlot::Audio, 9, Some("https://x/a.mp3".to_string()))
                .await,
            Err(GameError::InvalidIndex)
        );

        let game = state
            .set_media_url(MediaSlot::Audio, 1, Some("https://x/a.mp3".to_string()))
            .await
            .unwrap();
        assert_eq!(
            game.word_audio.get(&1),
            Some(&MediaRef::Url("https://x/a.mp3".to_string()))
        );
    }

    #[tokio::test]
    async fn test_upload_media() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state().with_media_storage(Arc::new(LocalMediaStorage::new(
            dir.path(),
            "static/uploads",
        )));
        state
            .load_words(WordSource::Url("u".to_string()))
            .await
            .unwrap();

        let (game, path) = state
            .upload_media(MediaSlot::Image, 1, Some("photo.JPG"), b"jpeg")
            .await
            .unwrap();
        assert!(path.starts_with("static/uploads/image_1_"));
        assert!(path.ends_with(".jpg"));
        assert_eq!(game.word_images.get(&1), Some(&MediaRef::File(path)));

        assert!(matches!(
            state
                .upload_media(MediaSlot::Audio, 0, Some("photo.png"), b"png")
                .await,
            Err(GameError::InvalidMediaType(_))
        ));
        assert_eq!(
            state.upload_media(MediaSlot::Audio, 0, Some(""), b"").await,
            Err(GameError::InvalidInput("No file selected".to_string()))
        );
        assert_eq!(
            state
                .upload_media(MediaSlot::Audio, 5, Some("a.mp3"), b"mp3")
                .await,
            Err(GameError::InvalidIndex)
        );
    }

    /// Hands out the seeded words once, then an empty scoreboard
    struct ShrinkingStore {
        first: std::sync::Mutex<Option<GameState>>,
    }

    #[async_trait]
    impl StateStore for ShrinkingStore {
        async fn load(&self) -> GameState {
            self.first.lock().unwrap().take().unwrap_or_default()
        }

        async fn save(&self, _state: &GameState) -> GameResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upload_discarded_when_word_disappears() {
        let dir = tempfile::tempdir().unwrap();
        let mut seeded = GameState::default();
        seeded.load_words(csv_import::normalize(SHEET));
        let store = ShrinkingStore {
            first: std::sync::Mutex::new(Some(seeded)),
        };
        let state = AppState::new(AppConfig::default(), Arc::new(store)).with_media_storage(
            Arc::new(LocalMediaStorage::new(dir.path(), "static/uploads")),
        );

        assert_eq!(
            state
                .upload_media(MediaSlot::Image, 1, Some("photo.png"), b"png")
                .await,
            Err(GameError::InvalidIndex)
        );
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_transitions_are_serialized() {
        let state = Arc::new(test_state());
        state
            .load_words(WordSource::Url("u".to_string()))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                state.mark_result(MarkOutcome::Correct).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let game = state.get_state().await;
        assert_eq!(game.team_a_score + game.team_b_score, 10);
        assert_eq!(game.team_a_score, 5);
    }
}
