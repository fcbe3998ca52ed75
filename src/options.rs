use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{BattlerError, Result};

// Top-level sections every battle input must carry, with the name used in error messages.
static REQUIRED_SECTIONS: [(&str, &str); 4] = [
    ("player_data", "player data"),
    ("battle_state", "battle state"),
    ("request_data", "request data"),
    ("failed_actions", "failed actions"),
];

/// Validated program options, resolved once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub player: String,
    /// Canonical JSON serialization of the battle input object.
    pub battle_input: String,
    pub use_cache: bool,
    pub data_dir: Option<PathBuf>,
    pub use_data_files: bool,
}

impl Options {
    /// Validates raw CLI values into options.
    ///
    /// The `use_data_files` flag combination is checked by the battler, not here.
    pub fn new(
        player: Option<&str>,
        battle_input: Option<&str>,
        use_cache: bool,
        data_dir: Option<&Path>,
        use_data_files: bool,
    ) -> Result<Self> {
        let player = validate_player(player)?.to_string();
        let battle_input = validate_battle_input(battle_input)?;
        let data_dir = match data_dir {
            Some(dir) => Some(validate_data_dir(Some(dir))?.to_path_buf()),
            None => None,
        };
        Ok(Self {
            player,
            battle_input,
            use_cache,
            data_dir,
            use_data_files,
        })
    }
}

pub fn validate_player(player: Option<&str>) -> Result<&str> {
    let player = match player {
        Some(player) if !player.is_empty() => player,
        _ => return Err(BattlerError::MissingField("Player ID")),
    };
    if !player
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(BattlerError::InvalidFormat(
            "Player is not an alphanumeric ID".to_string(),
        ));
    }
    Ok(player)
}

/// Parses the battle input and returns its canonical serialization.
pub fn validate_battle_input(input: Option<&str>) -> Result<String> {
    let input = match input {
        Some(input) if !input.is_empty() => input,
        _ => return Err(BattlerError::MissingField("Input")),
    };
    let value: Value = serde_json::from_str(input).map_err(|e| {
        BattlerError::InvalidFormat(format!("Battle input is not valid JSON: {}", e))
    })?;
    let Value::Object(object) = &value else {
        return Err(BattlerError::InvalidFormat(
            "Battle input must be a JSON object".to_string(),
        ));
    };

    if let Some((_, section)) = REQUIRED_SECTIONS
        .iter()
        .find(|(key, _)| !object.contains_key(*key))
    {
        return Err(BattlerError::IncompleteInput(*section));
    }

    Ok(serde_json::to_string(&value)?)
}

pub fn validate_data_dir(dir: Option<&Path>) -> Result<&Path> {
    let dir = match dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => return Err(BattlerError::MissingField("Data directory")),
    };
    if !dir.exists() {
        return Err(BattlerError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(BattlerError::NotADirectory(dir.to_path_buf()));
    }
    Ok(dir)
}
