use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub server_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub max_upload_bytes: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:4040".into(),
            connect_timeout_secs: 10,
            request_timeout_secs: None,
            max_upload_bytes: None,
        }
    }
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn endpoints(&self) -> anyhow::Result<Endpoints> {
        Endpoints::from_base_url(&self.server_url)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    max_upload_bytes: Option<u64>,
}

/// Defaults, then `client.toml` in the working directory, then environment.
pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |key| std::env::var(key).ok())
}

pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), "ignoring malformed settings file: {err}"),
        }
    }

    apply_env_overrides(&mut settings, env);
    settings
}

fn apply_file_settings(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.connect_timeout_secs {
        settings.connect_timeout_secs = v;
    }
    if file_cfg.request_timeout_secs.is_some() {
        settings.request_timeout_secs = file_cfg.request_timeout_secs;
    }
    if file_cfg.max_upload_bytes.is_some() {
        settings.max_upload_bytes = file_cfg.max_upload_bytes;
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__CONNECT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.connect_timeout_secs = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = Some(v);
    }
    if let Some(v) = env("APP__MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
        settings.max_upload_bytes = Some(v);
    }
}

/// Absolute URLs of the three backend resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub files: Url,
    pub predict: Url,
    pub actions: Url,
}

impl Endpoints {
    pub fn from_base_url(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        let mut base =
            Url::parse(raw).with_context(|| format!("invalid server url '{raw}'"))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("server url '{raw}' must be an http(s) url"));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let join = |path: &str| {
            base.join(path)
                .with_context(|| format!("failed to build endpoint '{path}' from '{raw}'"))
        };
        Ok(Self {
            files: join("api/files")?,
            predict: join("api/predict")?,
            actions: join("api/actions")?,
        })
    }
}
