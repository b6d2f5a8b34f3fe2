use crate::error::{FlorenceError, Result};
use std::env;
use std::fmt;
use std::time::Duration;

pub const API_KEY_VAR: &str = "API_KEY_REQUIRED_IF_EXECUTING_OUTSIDE_NGC";
/// Set to `1`, `true` or `yes` to send small images inline.
pub const INLINE_IMAGES_VAR: &str = "FLORENCE_INLINE_IMAGES";
pub const ASSETS_URL: &str = "https://api.nvcf.nvidia.com/v2/nvcf/assets";
pub const INFERENCE_URL: &str = "https://ai.api.nvidia.com/v1/vlm/microsoft/florence-2";

/// How the image is referenced from the request content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageMode {
    /// Always register and upload the image as an NVCF asset.
    #[default]
    Asset,
    /// Embed small images as base64 and fall back to an asset upload for
    /// anything over the inline ceiling.
    InlineWhenSmall,
}

/// Process-wide settings, built once in `main` and handed to each stage.
#[derive(Clone)]
pub struct Config {
    pub assets_url: String,
    pub inference_url: String,
    pub api_key_var: &'static str,
    pub api_key: String,
    pub asset_description: String,
    pub register_timeout: Duration,
    pub upload_timeout: Duration,
    /// `None` leaves the inference call unbounded.
    pub inference_timeout: Option<Duration>,
    pub image_mode: ImageMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_url: ASSETS_URL.to_string(),
            inference_url: INFERENCE_URL.to_string(),
            api_key_var: API_KEY_VAR,
            api_key: String::new(),
            asset_description: "Test Image".to_string(),
            register_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(300),
            inference_timeout: None,
            image_mode: ImageMode::Asset,
        }
    }
}

impl ImageMode {
    /// Anything other than an explicit opt-in keeps the asset upload.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => ImageMode::InlineWhenSmall,
            _ => ImageMode::Asset,
        }
    }
}

impl Config {
    /// Fixed endpoints plus the credential read from `API_KEY_VAR`. An unset
    /// and an empty variable are treated the same way.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(API_KEY_VAR).unwrap_or_default();
        let image_mode = env::var(INLINE_IMAGES_VAR)
            .map(|value| ImageMode::from_setting(&value))
            .unwrap_or_default();
        Self {
            image_mode,
            ..Self::default()
        }
        .with_api_key(api_key)
    }

    pub fn with_api_key(self, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(FlorenceError::MissingCredential {
                var: self.api_key_var,
            });
        }
        Ok(Self { api_key, ..self })
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("assets_url", &self.assets_url)
            .field("inference_url", &self.inference_url)
            .field("api_key_var", &self.api_key_var)
            .field("api_key", &"<redacted>")
            .field("asset_description", &self.asset_description)
            .field("register_timeout", &self.register_timeout)
            .field("upload_timeout", &self.upload_timeout)
            .field("inference_timeout", &self.inference_timeout)
            .field("image_mode", &self.image_mode)
            .finish()
    }
}
