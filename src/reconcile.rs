use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::Result;
use crate::service::{CachedContent, CreateCache, GenerativeService, RemoteFile, UploadFile};

/// Time-to-live of every content cache this crate creates.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid non-word pattern"));

/// Returns the uploaded file named `display_name`, uploading `path` under that name if no such
/// file exists yet.
///
/// An existing file is trusted as-is: its contents are not compared with `path`.
pub async fn ensure_file<S>(service: &S, display_name: &str, path: &Path) -> Result<RemoteFile>
where
    S: GenerativeService + ?Sized,
{
    let existing = service.list_files().await?;
    if let Some(file) = existing
        .into_iter()
        .find(|file| file.display_name.as_deref() == Some(display_name))
    {
        log::info!("File {} is already uploaded", path.display());
        return Ok(file);
    }

    log::info!("Uploading {}", path.display());
    let mime_type = mime_guess::from_path(path).first_raw().map(String::from);
    let bytes = tokio::fs::read(path).await?;
    let file = service
        .upload_file(UploadFile {
            display_name: display_name.to_string(),
            mime_type,
            bytes,
        })
        .await?;
    Ok(file)
}

/// Ensures every file under `dir` accepted by `filter` is uploaded.
///
/// Each file is named `{prefix}_{relative path}`, with every run of non-word characters in the
/// relative path collapsed to a single underscore.
pub async fn ensure_all_files_in_directory<S, F>(
    service: &S,
    prefix: &str,
    dir: &Path,
    filter: F,
) -> Result<Vec<RemoteFile>>
where
    S: GenerativeService + ?Sized,
    F: Fn(&Path) -> bool,
{
    log::info!("Ensuring all files in {} are uploaded", dir.display());
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        // Symlinked files count; `DirEntry::file_type` would not follow them.
        if !path.is_file() || !filter(path) {
            continue;
        }
        let display_name = display_name_for(prefix, dir, path);
        files.push(ensure_file(service, &display_name, path).await?);
    }
    Ok(files)
}

/// Derives the display name of a file under `dir`.
pub fn display_name_for(prefix: &str, dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    let name = NON_WORD.replace_all(&relative.to_string_lossy(), "_").into_owned();
    format!("{prefix}_{name}")
}

/// Returns the content cache named `display_name`, creating it if it does not exist.
///
/// An existing cache is returned untouched: its instruction, files, and expiry are not refreshed.
pub async fn ensure_cache<S>(
    service: &S,
    model: &str,
    display_name: &str,
    system_instruction: &str,
    files: Vec<RemoteFile>,
) -> Result<CachedContent>
where
    S: GenerativeService + ?Sized,
{
    let existing = service.list_caches().await?;
    if let Some(cache) = existing
        .into_iter()
        .find(|cache| cache.display_name.as_deref() == Some(display_name))
    {
        log::info!("Context cache {display_name} already exists");
        return Ok(cache);
    }

    log::info!("Creating context cache {display_name}");
    let cache = service
        .create_cache(CreateCache {
            model: model.to_string(),
            display_name: display_name.to_string(),
            system_instruction: system_instruction.to_string(),
            files,
            ttl: CACHE_TTL,
        })
        .await?;
    Ok(cache)
}
