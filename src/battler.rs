use std::path::Path;

use crate::debug::DebugSink;
use crate::error::{BattlerError, Result};
use crate::options::Options;
use crate::reconcile::{ensure_all_files_in_directory, ensure_cache};
use crate::service::{
    CachedContent, GenerateRequest, GenerationConfig, GenerativeService, RemoteFile,
};
use crate::settings::Settings;
use crate::template::Templates;

pub const PROMPT_DEBUG_FILE: &str = "prompt";
pub const RESPONSE_DEBUG_FILE: &str = "response";

/// Rejects flag combinations that cannot be honored. Runs before any remote call.
pub fn check_configuration(options: &Options) -> Result<()> {
    if options.use_data_files {
        if !options.use_cache {
            return Err(BattlerError::InvalidConfiguration(
                "Caching must be enabled if using data files".to_string(),
            ));
        }
        if options.data_dir.is_none() {
            return Err(BattlerError::InvalidConfiguration(
                "Data directory must be defined if using data files".to_string(),
            ));
        }
    }
    Ok(())
}

/// Chooses how the system context reaches the model.
///
/// A reconciled cache already holds the context and any files, so the request references it and
/// carries nothing else.
pub fn build_config(context: &str, cache: Option<&CachedContent>) -> GenerationConfig {
    match cache {
        Some(cache) => GenerationConfig::Cached {
            cache_name: cache.name.clone(),
        },
        None => GenerationConfig::Inline {
            system_instruction: context.to_string(),
            files: Vec::new(),
        },
    }
}

/// Produces battle decisions through a generative service.
pub struct GeminiBattler<S> {
    service: S,
    settings: Settings,
    templates: Templates,
    debug: DebugSink,
}

impl<S: GenerativeService> GeminiBattler<S> {
    pub fn new(service: S, settings: Settings, templates: Templates) -> Self {
        Self {
            service,
            settings,
            templates,
            debug: DebugSink::disabled(),
        }
    }

    pub fn with_debug_sink(mut self, debug: DebugSink) -> Self {
        self.debug = debug;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Runs one decision for `options` and returns the model's text.
    pub async fn decide(&self, options: &Options) -> Result<String> {
        check_configuration(options)?;
        let prompt = self
            .templates
            .render_prompt(&options.player, &options.battle_input)?;

        let model = self.service.get_model(&self.settings.model).await?;
        log::info!(
            "Starting Gemini x battler on {} (input token limit = {})",
            model.name,
            model
                .input_token_limit
                .map_or_else(|| "unknown".to_string(), |limit| limit.to_string())
        );

        self.debug.write(PROMPT_DEBUG_FILE, &prompt);

        let files = match (&options.data_dir, options.use_data_files) {
            (Some(dir), true) => self.reconcile_data_files(dir).await?,
            _ => Vec::new(),
        };

        let cache = if options.use_cache {
            Some(
                ensure_cache(
                    &self.service,
                    &model.name,
                    &self.settings.cache_display_name,
                    &self.templates.context,
                    files,
                )
                .await?,
            )
        } else {
            None
        };

        let config = build_config(&self.templates.context, cache.as_ref());

        log::info!("Generating content...");
        let response = self
            .service
            .generate_content(GenerateRequest {
                model: model.name,
                prompt,
                config,
            })
            .await
            .map_err(|e| BattlerError::GenerationFailed(e.to_string()))?;

        self.debug.write(RESPONSE_DEBUG_FILE, &response.raw.to_string());

        response
            .text
            .filter(|text| !text.is_empty())
            .ok_or_else(|| BattlerError::GenerationFailed("Model returned no text".to_string()))
    }

    async fn reconcile_data_files(&self, dir: &Path) -> Result<Vec<RemoteFile>> {
        ensure_all_files_in_directory(
            &self.service,
            &self.settings.data_file_prefix,
            dir,
            |path| self.settings.is_data_file(path),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(use_cache: bool, data_dir: bool, use_data_files: bool) -> Options {
        Options {
            player: "p1".to_string(),
            battle_input: "{}".to_string(),
            use_cache,
            data_dir: data_dir.then(|| std::env::temp_dir()),
            use_data_files,
        }
    }

    #[test]
    fn data_files_require_cache_and_directory() {
        assert!(check_configuration(&options(false, false, false)).is_ok());
        assert!(check_configuration(&options(true, false, false)).is_ok());
        assert!(check_configuration(&options(true, true, true)).is_ok());
        assert!(matches!(
            check_configuration(&options(false, true, true)),
            Err(BattlerError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            check_configuration(&options(true, false, true)),
            Err(BattlerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn cache_reference_excludes_inline_instruction() {
        let cache = CachedContent {
            name: "cachedContents/abc".to_string(),
            display_name: Some("battler".to_string()),
            model: None,
            expire_time: None,
        };
        let config = build_config("context", Some(&cache));
        assert_eq!(config.cache_name(), Some("cachedContents/abc"));
        assert_eq!(config.system_instruction(), None);

        let config = build_config("context", None);
        assert_eq!(config.cache_name(), None);
        assert_eq!(config.system_instruction(), Some("context"));
    }
}
