// Import necessary libraries and modules for file I/O and deserialization.
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// Settings that tune a battler run without changing its behavior.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub model: String,              // Model resource name used for caching and generation.
    pub api_key_env: String,        // Environment variable holding the API key.
    pub base_url: String,           // Root of the Generative Language API.
    pub cache_display_name: String, // Display name of the shared context cache.
    pub data_file_prefix: String,   // Display-name prefix for uploaded data files.
    pub data_file_extension: String, // Only data files with this extension are uploaded.
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_display_name: "battler".to_string(),
            data_file_prefix: "data".to_string(),
            data_file_extension: "json".to_string(),
        }
    }
}

impl Settings {
    // Load settings from a specified file path. Missing fields keep their defaults.
    pub fn load_from_file(path: &Path) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn is_data_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.data_file_extension)
    }
}
