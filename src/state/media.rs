//! Uploaded media for words: extension checks and where the bytes go.
//!
//! The scoreboard itself only records `MediaRef`s; this module turns an
//! upload into the relative path that ends up in the record.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{GameError, GameResult};
use crate::types::{MediaSlot, WordIndex};

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const ALLOWED_AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a"];

impl MediaSlot {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            MediaSlot::Image => ALLOWED_IMAGE_EXTENSIONS,
            MediaSlot::Audio => ALLOWED_AUDIO_EXTENSIONS,
        }
    }
}

/// Lower-cased extension of `filename` if it is allowed for `slot`
pub fn validated_extension(slot: MediaSlot, filename: &str) -> GameResult<String> {
    let invalid = || {
        let message = match slot {
            MediaSlot::Image => "Invalid file type".to_string(),
            MediaSlot::Audio => format!(
                "Invalid file type. Use {}",
                ALLOWED_AUDIO_EXTENSIONS.join(", ")
            ),
        };
        GameError::InvalidMediaType(message)
    };

    let (_, ext) = filename.rsplit_once('.').ok_or_else(invalid)?;
    let ext = ext.to_lowercase();
    if slot.allowed_extensions().contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(invalid())
    }
}

/// Name an upload is stored under: `<slot>_<index>_<unix millis>.<ext>`
pub fn upload_file_name(slot: MediaSlot, index: WordIndex, ext: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        slot.label(),
        index,
        chrono::Utc::now().timestamp_millis(),
        ext
    )
}

/// Stores uploaded media bytes and returns the path clients load them from
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> GameResult<String>;

    /// Remove a stored upload that never made it into the scoreboard
    async fn discard(&self, file_name: &str);
}

/// Writes uploads into a local directory that is served statically
pub struct LocalMediaStorage {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalMediaStorage {
    pub fn new(dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into(),
        }
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> GameResult<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| GameError::Storage(format!("Failed to create upload dir: {}", e)))?;

        tokio::fs::write(self.dir.join(file_name), bytes)
            .await
            .map_err(|e| GameError::Storage(format!("Failed to store upload: {}", e)))?;

        tracing::info!("Stored upload {} ({} bytes)", file_name, bytes.len());
        Ok(format!(
            "{}/{}",
            self.public_prefix.trim_end_matches('/'),
            file_name
        ))
    }

    async fn discard(&self, file_name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            tracing::warn!("Failed to remove upload {}: {}", file_name, e);
        }
    }
}
