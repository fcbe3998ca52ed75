use std::fs;
use std::path::Path;

use regex::{NoExpand, Regex};

use crate::error::{BattlerError, Result};

const CONTEXT: &str = include_str!("../templates/context.md");
const PROMPT: &str = include_str!("../templates/prompt.md");

pub const CONTEXT_FILE: &str = "context.md";
pub const PROMPT_FILE: &str = "prompt.md";

pub const PLAYER_KEY: &str = "PLAYER";
pub const INPUT_KEY: &str = "INPUT";

/// Replaces every `${{ KEY }}` placeholder for `key` with `value`.
///
/// The key is matched literally and whitespace inside the braces is optional. The value is
/// inserted verbatim and never scanned for further placeholders.
pub fn render(template: &str, key: &str, value: &str) -> Result<String> {
    let pattern = format!(r"\$\{{\{{\s*{}\s*\}}\}}", regex::escape(key));
    let placeholder = Regex::new(&pattern)
        .map_err(|e| BattlerError::InvalidFormat(format!("Invalid template key {key:?}: {e}")))?;
    Ok(placeholder
        .replace_all(template, NoExpand(value))
        .into_owned())
}

/// The system context and per-call prompt templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub context: String,
    pub prompt: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self::bundled()
    }
}

impl Templates {
    pub fn new(context: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            prompt: prompt.into(),
        }
    }

    /// Templates compiled into the binary.
    pub fn bundled() -> Self {
        Self::new(CONTEXT, PROMPT)
    }

    /// Reads `context.md` and `prompt.md` from `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self::new(
            read_template(dir, CONTEXT_FILE)?,
            read_template(dir, PROMPT_FILE)?,
        ))
    }

    pub fn render_prompt(&self, player: &str, battle_input: &str) -> Result<String> {
        let prompt = render(&self.prompt, PLAYER_KEY, player)?;
        render(&prompt, INPUT_KEY, battle_input)
    }
}

fn read_template(dir: &Path, file: &str) -> Result<String> {
    let path = dir.join(file);
    if !path.exists() {
        return Err(BattlerError::NotFound(path));
    }
    Ok(fs::read_to_string(path)?)
}
