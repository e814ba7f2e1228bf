use super::error::{ConvError, ConvResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Video file extensions accepted when a directory is queued
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "webm", "mov", "avi", "flv", "m4v", "wmv", "ogg", "ogv", "mpg", "mpeg", "ts",
];

/// Picture extensions accepted for slideshows
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.contains(&e.to_lowercase().as_str()))
}

pub fn is_video_file(path: &Path) -> bool {
    has_extension(path, VIDEO_EXTENSIONS)
}

pub fn is_image_file(path: &Path) -> bool {
    has_extension(path, IMAGE_EXTENSIONS)
}

/// Expand the queued paths: files are kept as given, directories contribute
/// their matching files (recursively, sorted by path).
pub fn collect_sources(paths: &[PathBuf], images: bool) -> Vec<PathBuf> {
    let matches = |p: &Path| {
        if images {
            is_image_file(p)
        } else {
            is_video_file(p)
        }
    };

    let mut sources = Vec::new();
    for path in paths {
        if !path.is_dir() {
            sources.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && matches(e.path()))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        sources.extend(found);
    }
    sources
}

/// Next free numeric suffix for entries named `<prefix><n>` (optionally
/// followed by `.ext`) directly inside `dir`: one more than the highest
/// existing number, or 1 when there is none.
pub fn next_suffix(dir: &Path, prefix: &str) -> ConvResult<u32> {
    if !dir.is_dir() {
        return Err(ConvError::validation(
            format!("Destination is not a directory: {}", dir.display()),
            dir,
        ));
    }

    let mut highest = 0;
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            ConvError::validation(format!("Cannot read destination: {}", e), dir)
        })?;
        let name = entry.file_name().to_string_lossy();
        if let Some(n) = parse_suffix(&name, prefix) {
            highest = highest.max(n);
        }
    }
    Ok(highest + 1)
}

fn parse_suffix(name: &str, prefix: &str) -> Option<u32> {
    let rest = name.strip_prefix(prefix)?;
    let digits = rest.split('.').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Hands out numeric suffixes for one run. Numbers handed out earlier in
/// the same run count as taken even though nothing exists on disk yet.
#[derive(Debug, Default)]
pub struct SuffixAllocator {
    reserved: HashMap<(PathBuf, String), u32>,
}

impl SuffixAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, dir: &Path, prefix: &str) -> ConvResult<u32> {
        let on_disk = next_suffix(dir, prefix)?;
        let key = (dir.to_path_buf(), prefix.to_string());
        let n = match self.reserved.get(&key) {
            Some(&last) => on_disk.max(last + 1),
            None => on_disk,
        };
        self.reserved.insert(key, n);
        Ok(n)
    }
}

/// `<dir>/<stem>.<ext>`; `None` keeps the source extension (stream copy)
pub fn derive_output_path(input: &Path, dest: Option<&Path>, ext: Option<&str>) -> PathBuf {
    let dir = dest
        .map(Path::to_path_buf)
        .unwrap_or_else(|| source_dir(input));
    let stem = base_name(input);
    let ext = ext
        .map(str::to_string)
        .or_else(|| input.extension().map(|e| e.to_string_lossy().into_owned()));
    match ext {
        Some(ext) => dir.join(format!("{}.{}", stem, ext)),
        None => dir.join(stem),
    }
}

pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

pub fn source_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
