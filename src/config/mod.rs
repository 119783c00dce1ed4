//! Configuration module for the QR backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default upload ceiling for a single request body (25 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Which object store backend to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Objects are written below a local directory.
    Local,
    /// Objects are written to an S3 (or S3-compatible) bucket.
    S3,
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// S3 connection settings.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for MinIO/LocalStack
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    pub storage_backend: StorageBackend,
    /// Root directory for the local object store
    pub storage_path: PathBuf,
    /// Prefix used to turn object keys into URLs
    pub public_base_url: String,
    pub s3: S3Config,
    /// Maximum accepted request body size for uploads
    pub max_upload_bytes: usize,
    /// Minimum edge length of rendered QR images, in pixels
    pub qr_image_size: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("QRS_DB_PATH")
            .unwrap_or_else(|_| "./data/qrs.sqlite".to_string())
            .into();

        let bind_addr = env::var("QRS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid QRS_BIND_ADDR format");

        let log_level = env::var("QRS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("QRS_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let storage_backend = match env::var("QRS_STORAGE_BACKEND").as_deref() {
            Ok("s3") => StorageBackend::S3,
            Ok("local") | Err(_) => StorageBackend::Local,
            Ok(other) => {
                eprintln!("Unknown QRS_STORAGE_BACKEND '{}', using local storage", other);
                StorageBackend::Local
            }
        };

        let storage_path = env::var("QRS_STORAGE_PATH")
            .unwrap_or_else(|_| "./data/objects".to_string())
            .into();

        let public_base_url = env::var("QRS_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8080/objects".to_string())
            .trim_end_matches('/')
            .to_string();

        let s3 = S3Config {
            bucket: env::var("QRS_S3_BUCKET").unwrap_or_else(|_| "qrs".to_string()),
            region: env::var("QRS_S3_REGION").unwrap_or_else(|_| "us-west-1".to_string()),
            endpoint_url: env::var("QRS_S3_ENDPOINT_URL").ok(),
            force_path_style: parse_or("QRS_S3_FORCE_PATH_STYLE", false),
        };

        let max_upload_bytes = parse_or("QRS_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES);
        let qr_image_size = parse_or("QRS_QR_IMAGE_SIZE", 300);

        Self {
            db_path,
            bind_addr,
            log_level,
            log_format,
            storage_backend,
            storage_path,
            public_base_url,
            s3,
            max_upload_bytes,
            qr_image_size,
        }
    }
}

/// Parse an environment variable, keeping the default when it is unset or malformed.
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            eprintln!("Ignoring malformed {}='{}'", key, raw);
            default
        }),
        Err(_) => default,
    }
}
