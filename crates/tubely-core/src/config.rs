//! Configuration module
//!
//! Settings are read from the process environment (after loading an optional `.env`
//! file) and grouped into server, storage and media sections.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 8091;
const JWT_EXPIRY_HOURS: i64 = 24;
const MIN_JWT_SECRET_LEN: usize = 32;
const MAX_VIDEO_SIZE_MB: usize = 1024;
const PROBE_TIMEOUT_SECS: u64 = 30;
const REMUX_TIMEOUT_SECS: u64 = 600;
const UPLOAD_TIMEOUT_SECS: u64 = 300;

/// HTTP server, auth and logging settings.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub environment: String,
    pub log_format: String,
}

/// Object storage settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    // Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, ...)
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

/// Upload limits, external tool locations and stage deadlines.
#[derive(Clone, Debug)]
pub struct MediaConfig {
    pub max_video_size_bytes: usize,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub probe_timeout_secs: u64,
    pub remux_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub temp_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub storage: StorageConfig,
    pub media: MediaConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            jwt_expiry_hours: env_or("JWT_EXPIRY_HOURS", JWT_EXPIRY_HOURS),
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string())
                .to_lowercase(),
        };

        let backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::S3,
        };

        let storage = StorageConfig {
            backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
        };

        let max_video_size_bytes = env_or("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB)
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow::anyhow!("MAX_VIDEO_SIZE_MB is too large"))?;

        let media = MediaConfig {
            max_video_size_bytes,
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            probe_timeout_secs: env_or("PROBE_TIMEOUT_SECS", PROBE_TIMEOUT_SECS),
            remux_timeout_secs: env_or("REMUX_TIMEOUT_SECS", REMUX_TIMEOUT_SECS),
            upload_timeout_secs: env_or("UPLOAD_TIMEOUT_SECS", UPLOAD_TIMEOUT_SECS),
            temp_dir: env_opt("PIPELINE_TEMP_DIR").map(PathBuf::from),
        };

        Ok(Config {
            base,
            storage,
            media,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            ));
        }

        if self.media.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be greater than 0"));
        }

        if self.media.probe_timeout_secs == 0
            || self.media.remux_timeout_secs == 0
            || self.media.upload_timeout_secs == 0
        {
            return Err(anyhow::anyhow!("Stage timeouts must be greater than 0 seconds"));
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region().is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn jwt_secret(&self) -> &str {
        &self.base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.base.jwt_expiry_hours
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn json_logs(&self) -> bool {
        self.base.log_format == "json"
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage.backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.storage.s3_bucket.as_deref()
    }

    /// `S3_REGION`, falling back to `AWS_REGION`.
    pub fn s3_region(&self) -> Option<&str> {
        self.storage
            .s3_region
            .as_deref()
            .or(self.storage.aws_region.as_deref())
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.storage.s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.storage.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.storage.local_storage_base_url.as_deref()
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.media.max_video_size_bytes
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.media.ffprobe_path
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.media.ffmpeg_path
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.media.probe_timeout_secs)
    }

    pub fn remux_timeout(&self) -> Duration {
        Duration::from_secs(self.media.remux_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.media.upload_timeout_secs)
    }

    /// Root under which per-run workspaces are created.
    pub fn pipeline_temp_dir(&self) -> PathBuf {
        self.media.temp_dir.clone().unwrap_or_else(env::temp_dir)
    }
}
