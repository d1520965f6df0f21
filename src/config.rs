use std::env;
use std::path::PathBuf;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Optional path to an exported ONNX model; absent means the random
    /// placeholder policy serves predictions.
    pub model_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let host = env::var("SEVERITY_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("SEVERITY_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);
        let model_path = env::var("SEVERITY_MODEL").ok().map(PathBuf::from);
        Self {
            host,
            port,
            model_path,
        }
    }
}
