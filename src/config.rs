//! Runtime configuration, read from the environment (and `.env`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BIND: &str = "0.0.0.0:5001";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,
    /// JSON file holding the persisted scoreboard
    pub state_file: PathBuf,
    /// Sheet loaded when no source is given, and at startup if no words exist
    pub sample_csv: PathBuf,
    /// Directory served as static files (pages, sounds, uploads)
    pub static_dir: PathBuf,
    /// Directory uploaded media is written to
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Timeout for fetching a sheet by URL
    pub fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5001)),
            state_file: PathBuf::from("state.json"),
            sample_csv: PathBuf::from("sample_words.csv"),
            static_dir: PathBuf::from("static"),
            upload_dir: PathBuf::from("static/uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

impl AppConfig {
    /// Whether uploads live inside the static dir (and are served under `/static`)
    pub fn uploads_under_static(&self) -> bool {
        self.upload_dir.starts_with(&self.static_dir)
    }

    /// Relative URL prefix recorded for uploaded media, e.g. `static/uploads`
    pub fn upload_public_prefix(&self) -> String {
        match self.upload_dir.strip_prefix(&self.static_dir) {
            Ok(rel) => {
                let rel = rel.to_string_lossy().replace('\\', "/");
                if rel.is_empty() {
                    "static".to_string()
                } else {
                    format!("static/{}", rel.trim_matches('/'))
                }
            }
            _ => "uploads".to_string(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = match env_string("SCOREBOARD_BIND") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(
                    "Invalid SCOREBOARD_BIND {:?} ({}), using {}",
                    raw,
                    e,
                    DEFAULT_BIND
                );
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        Self {
            bind_addr,
            state_file: env_string("SCOREBOARD_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_file),
            sample_csv: env_string("SCOREBOARD_SAMPLE_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.sample_csv),
            static_dir: env_string("SCOREBOARD_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            upload_dir: env_string("SCOREBOARD_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: env_string("SCOREBOARD_MAX_UPLOAD_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            fetch_timeout: env_string("SCOREBOARD_FETCH_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "SCOREBOARD_BIND",
        "SCOREBOARD_STATE_FILE",
        "SCOREBOARD_SAMPLE_CSV",
        "SCOREBOARD_STATIC_DIR",
        "SCOREBOARD_UPLOAD_DIR",
        "SCOREBOARD_MAX_UPLOAD_BYTES",
        "SCOREBOARD_FETCH_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        let config = AppConfig::from_env();
        assert_eq!(config.bind_addr.port(), 5001);
        assert_eq!(config.state_file, PathBuf::from("state.json"));
        assert_eq!(config.upload_dir, PathBuf::from("static/uploads"));
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("SCOREBOARD_BIND", "127.0.0.1:8080");
        std::env::set_var("SCOREBOARD_STATE_FILE", " /tmp/game.json ");
        std::env::set_var("SCOREBOARD_FETCH_TIMEOUT_SECS", "3");

        let config = AppConfig::from_env();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.state_file, PathBuf::from("/tmp/game.json"));
        assert_eq!(config.fetch_timeout, Duration::from_secs(3));
        clear_env();
    }

    #[test]
    fn test_upload_public_prefix() {
        let config = AppConfig::default();
        assert!(config.uploads_under_static());
        assert_eq!(config.upload_public_prefix(), "static/uploads");

        let elsewhere = AppConfig {
            upload_dir: PathBuf::from("/var/lib/scoreboard/media"),
            ..AppConfig::default()
        };
        assert!(!elsewhere.uploads_under_static());
        assert_eq!(elsewhere.upload_public_prefix(), "uploads");
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        std::env::set_var("SCOREBOARD_BIND", "not-an-address");
        std::env::set_var("SCOREBOARD_MAX_UPLOAD_BYTES", "lots");
        std::env::set_var("SCOREBOARD_SAMPLE_CSV", "   ");

        let config = AppConfig::from_env();
        assert_eq!(config.bind_addr.port(), 5001);
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.sample_csv, PathBuf::from("sample_words.csv"));
        clear_env();
    }
}
