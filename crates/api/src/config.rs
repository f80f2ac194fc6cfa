use std::path::PathBuf;

use vaani_core::capacity::{derive_worker_count, DEFAULT_QUEUE_DEPTH};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `7860`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown drain timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Root of the artifact tree (default: `uploads`).
    pub uploads_dir: PathBuf,
    /// Pipeline worker count. `WORKER_COUNT=0` (the default) derives it
    /// from the machine's available parallelism.
    pub worker_count: usize,
    /// Admission queue depth (default: `20`).
    pub queue_depth: usize,
    /// When `true`, uploads are restricted to the supported language
    /// registry; when `false`, any well-formed code pair is accepted.
    pub strict_languages: bool,
    /// Hours a terminal job (record and artifacts) is kept before the
    /// retention loop purges it (default: `24`).
    pub retention_hours: i64,
    /// Global multiplier applied to every per-stage timeout (default: `1.0`).
    pub stage_timeout_multiplier: f64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                    |
    /// |----------------------------|----------------------------|
    /// | `HOST`                     | `0.0.0.0`                  |
    /// | `PORT`                     | `7860`                     |
    /// | `CORS_ORIGINS`             | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`     | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`    | `30`                       |
    /// | `UPLOADS_DIR`              | `uploads`                  |
    /// | `WORKER_COUNT`             | `0` (auto)                 |
    /// | `QUEUE_DEPTH`              | `20`                       |
    /// | `STRICT_LANGUAGES`         | `true`                     |
    /// | `RETENTION_HOURS`          | `24`                       |
    /// | `STAGE_TIMEOUT_MULTIPLIER` | `1.0`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "7860".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let uploads_dir =
            PathBuf::from(std::env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".into()));

        let configured_workers: usize = std::env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "0".into())
            .parse()
            .expect("WORKER_COUNT must be a valid usize");
        let worker_count = if configured_workers == 0 {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            derive_worker_count(cores)
        } else {
            configured_workers
        };

        let queue_depth: usize = std::env::var("QUEUE_DEPTH")
            .unwrap_or_else(|_| DEFAULT_QUEUE_DEPTH.to_string())
            .parse()
            .expect("QUEUE_DEPTH must be a valid usize");

        let strict_languages: bool = std::env::var("STRICT_LANGUAGES")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("STRICT_LANGUAGES must be true or false");

        let retention_hours: i64 = std::env::var("RETENTION_HOURS")
            .unwrap_or_else(|_| "24".into())
            .parse()
            .expect("RETENTION_HOURS must be a valid i64");

        let stage_timeout_multiplier: f64 = std::env::var("STAGE_TIMEOUT_MULTIPLIER")
            .unwrap_or_else(|_| "1.0".into())
            .parse()
            .expect("STAGE_TIMEOUT_MULTIPLIER must be a valid f64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            uploads_dir,
            worker_count,
            queue_depth,
            strict_languages,
            retention_hours,
            stage_timeout_multiplier,
        }
    }
}
