pub mod battler;
pub mod debug;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod options;
pub mod reconcile;
pub mod service;
pub mod settings;
pub mod template;

// Re-export commonly used items for easier access
pub use battler::{GeminiBattler, build_config, check_configuration};
pub use debug::DebugSink;
pub use error::{BattlerError, RemoteError, Result};
pub use gemini::GeminiClient;
pub use options::Options;
pub use reconcile::{CACHE_TTL, ensure_all_files_in_directory, ensure_cache, ensure_file};
pub use service::{
    CachedContent, CreateCache, GenerateRequest, GenerateResponse, GenerationConfig,
    GenerativeService, ModelInfo, RemoteFile, UploadFile,
};
pub use settings::Settings;
pub use template::{Templates, render};
