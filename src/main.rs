use std::io;
use std::path::{Path, PathBuf};

use battler_ai_gemini::{
    DebugSink, GeminiBattler, GeminiClient, Options, Settings, Templates, logging,
};
use clap::{ArgAction, Parser};
use color_eyre::eyre::{Result, WrapErr, eyre};

#[derive(Debug, Parser)]
#[command(name = "battler-ai-gemini", about = "battler AI via Gemini")]
struct Cli {
    /// Player ID
    #[arg(long)]
    player: Option<String>,

    /// Battle input, in JSON form
    #[arg(long)]
    input: Option<String>,

    /// Whether or not to use context caching
    #[arg(
        long = "use_cache",
        action = ArgAction::Set,
        value_parser = parse_bool,
        default_value = "true"
    )]
    use_cache: bool,

    /// Battle data directory; only required if sending data files
    #[arg(long)]
    data: Option<PathBuf>,

    /// Whether or not to include all data files (not recommended, as input token count gets too high)
    #[arg(
        long = "use_data_files",
        action = ArgAction::Set,
        value_parser = parse_bool,
        default_value = "false"
    )]
    use_data_files: bool,

    /// Directory holding context.md and prompt.md; defaults to the bundled templates
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        _ => Err(format!("{value} is not a valid boolean value")),
    }
}

// `SetLoggerError` only implements `std::error::Error` with log's `std` feature.
fn init_logging(verbose: bool) -> Result<()> {
    logging::init(verbose).map_err(|err| eyre!("{err}"))
}

// Directory of the executable, or the current directory if it cannot be located.
fn binary_dir(exe: io::Result<PathBuf>) -> PathBuf {
    match exe {
        Ok(exe) => exe.parent().map(Path::to_path_buf).unwrap_or_default(),
        Err(err) => {
            log::warn!("Failed to locate the executable, using the current directory: {err}");
            PathBuf::from(".")
        }
    }
}

// A missing .env is fine; the key may already be in the environment.
fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path(path) {
        Ok(()) => true,
        Err(err) => {
            log::debug!("Skipping {}: {err}", path.display());
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let options = Options::new(
        cli.player.as_deref(),
        cli.input.as_deref(),
        cli.use_cache,
        cli.data.as_deref(),
        cli.use_data_files,
    )?;

    let binary_dir = binary_dir(std::env::current_exe());
    load_env_file(&binary_dir.join(".env"));
    load_env_file(Path::new(".env"));

    let settings = match &cli.settings {
        Some(path) => Settings::load_from_file(path)
            .wrap_err_with(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let templates = match &cli.templates {
        Some(dir) => Templates::load(dir)?,
        None => Templates::bundled(),
    };

    let client = GeminiClient::from_env(&settings)?;
    let battler = GeminiBattler::new(client, settings, templates)
        .with_debug_sink(DebugSink::in_dir(&binary_dir));

    let output = battler.decide(&options).await?;
    println!("Output");
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boolean_spellings() {
        for value in ["true", "T", "1", "yes", "Y"] {
            assert_eq!(parse_bool(value), Ok(true));
        }
        for value in ["false", "F", "0", "No", "n"] {
            assert_eq!(parse_bool(value), Ok(false));
        }
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn logger_installs_once() {
        let _ = init_logging(false);
        assert!(init_logging(true).is_err());
    }

    #[test]
    fn binary_dir_falls_back_to_current_directory() {
        assert_eq!(
            binary_dir(Ok(PathBuf::from("/opt/battler/battler-ai-gemini"))),
            PathBuf::from("/opt/battler")
        );
        assert_eq!(
            binary_dir(Err(io::Error::other("no executable"))),
            PathBuf::from(".")
        );
    }

    #[test]
    fn env_files_load_when_present_and_well_formed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_env_file(&dir.path().join(".env")));

        let malformed = dir.path().join("malformed.env");
        std::fs::write(&malformed, "not a valid line\n").unwrap();
        assert!(!load_env_file(&malformed));

        let valid = dir.path().join("valid.env");
        std::fs::write(&valid, "BATTLER_AI_GEMINI_TEST_ENV=loaded\n").unwrap();
        assert!(load_env_file(&valid));
        assert_eq!(
            std::env::var("BATTLER_AI_GEMINI_TEST_ENV").as_deref(),
            Ok("loaded")
        );
    }

    #[test]
    fn flags_have_defaults() {
        let cli = Cli::parse_from(["battler-ai-gemini", "--player", "p1"]);
        assert!(cli.use_cache);
        assert!(!cli.use_data_files);

        let cli = Cli::parse_from([
            "battler-ai-gemini",
            "--use_cache",
            "no",
            "--use_data_files",
            "yes",
        ]);
        assert!(!cli.use_cache);
        assert!(cli.use_data_files);
    }
}
