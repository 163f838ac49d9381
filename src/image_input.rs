//! Input source collection: files, directories, and glob patterns.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for image collection behavior.
#[derive(Debug, Clone)]
pub struct ImageInputConfig {
    pub strict_mode: bool,
    pub require_glob_matches: bool,
}

impl Default for ImageInputConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl ImageInputConfig {
    /// Strict mode: missing or unsupported explicit sources are errors.
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            require_glob_matches: true,
        }
    }

    /// Permissive mode: problems are logged as warnings and skipped.
    pub fn permissive() -> Self {
        Self {
            strict_mode: false,
            require_glob_matches: false,
        }
    }

    pub fn from_strict_flag(strict: bool) -> Self {
        if strict {
            Self::strict()
        } else {
            Self::permissive()
        }
    }
}

/// Check if a file has a supported image extension.
/// Supports: jpg, jpeg, png, webp, bmp, tiff, tif
pub fn is_supported_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(
                ext_lower.as_str(),
                "jpg" | "jpeg" | "png" | "webp" | "bmp" | "tiff" | "tif"
            )
        })
        .unwrap_or(false)
}

/// Find all image files in a directory, non-recursive, sorted for stable
/// ordering. Result files written by an earlier run (suffix `_detect`) are
/// skipped so repeated runs over the same directory do not re-process them.
pub fn find_images_in_directory(dir_path: &Path) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    for entry in fs::read_dir(dir_path)? {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() || !is_supported_image_file(&path) {
            continue;
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if stem.ends_with("_detect") {
            continue;
        }
        image_files.push(path);
    }

    image_files.sort();
    Ok(image_files)
}

/// Collect image files from multiple sources (files, directories, or glob
/// patterns), deduplicated and sorted.
pub fn collect_images_from_sources(
    sources: &[String],
    config: &ImageInputConfig,
) -> Result<Vec<PathBuf>> {
    let mut all_image_files = Vec::new();

    for source in sources {
        let source_path = Path::new(source);

        if source_path.is_file() {
            if is_supported_image_file(source_path) {
                all_image_files.push(source_path.to_path_buf());
            } else if config.strict_mode {
                anyhow::bail!(
                    "File is not a supported image format: {}",
                    source_path.display()
                );
            }
        } else if source_path.is_dir() {
            all_image_files.extend(find_images_in_directory(source_path)?);
        } else if !source.contains('*') && !source.contains('?') && !source.contains('[') {
            // A plain path that does not exist
            if config.strict_mode {
                anyhow::bail!("File does not exist: {source}");
            }
            log::warn!(
                "{}File does not exist: {source}",
                crate::color_utils::symbols::warning()
            );
        } else {
            match glob::glob(source) {
                Ok(paths) => {
                    let mut found_any = false;
                    for path_result in paths {
                        match path_result {
                            Ok(path) => {
                                if path.is_file() && is_supported_image_file(&path) {
                                    all_image_files.push(path);
                                    found_any = true;
                                }
                            }
                            Err(e) => {
                                log::warn!(
                                    "{}Error reading path in glob {source}: {e}",
                                    crate::color_utils::symbols::warning()
                                );
                            }
                        }
                    }
                    if !found_any && config.require_glob_matches {
                        anyhow::bail!("No image files found matching pattern: {source}");
                    }
                }
                Err(_) => {
                    if config.strict_mode {
                        anyhow::bail!(
                            "Source path does not exist and is not a valid glob pattern: {source}"
                        );
                    }
                    log::warn!(
                        "{}Source path does not exist: {source}",
                        crate::color_utils::symbols::warning()
                    );
                }
            }
        }
    }

    all_image_files.sort();
    all_image_files.dedup();

    if all_image_files.is_empty() && config.strict_mode {
        anyhow::bail!("No image files found in the specified sources");
    }

    Ok(all_image_files)
}
