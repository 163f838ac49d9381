//! Output path generation for annotated images.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Extension for the annotated copy: PNG inputs stay PNG to preserve
/// transparency, everything else becomes JPEG.
pub fn output_extension(input_path: &Path) -> &'static str {
    match input_path.extension() {
        Some(ext) if ext.to_string_lossy().to_lowercase() == "png" => "png",
        _ => "jpg",
    }
}

/// Path for the annotated copy of an input image.
///
/// With an output directory the name is kept clean (`<stem>.<ext>`); next to
/// the input it gets the `_detect` suffix so the original is never clobbered.
pub fn annotated_image_path(input_path: &Path, output_dir: Option<&str>) -> Result<PathBuf> {
    let input_stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = output_extension(input_path);

    let output_path = if let Some(dir) = output_dir {
        let dir = Path::new(dir);
        std::fs::create_dir_all(dir)?;
        dir.join(format!("{input_stem}.{extension}"))
    } else {
        input_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("{input_stem}_detect.{extension}"))
    };

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_extension_rules() {
        assert_eq!(output_extension(Path::new("a.png")), "png");
        assert_eq!(output_extension(Path::new("a.PNG")), "png");
        assert_eq!(output_extension(Path::new("a.jpg")), "jpg");
        assert_eq!(output_extension(Path::new("a.webp")), "jpg");
        assert_eq!(output_extension(Path::new("a")), "jpg");
    }

    #[test]
    fn test_annotated_path_next_to_input_gets_suffix() {
        let path = annotated_image_path(Path::new("/data/test/cat1.jpg"), None).unwrap();
        assert_eq!(path, Path::new("/data/test/cat1_detect.jpg"));
    }

    #[test]
    fn test_annotated_path_in_output_dir_is_clean() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("results");
        let path = annotated_image_path(
            Path::new("/data/test/cat1.jpg"),
            Some(out.to_string_lossy().as_ref()),
        )
        .unwrap();
        assert_eq!(path, out.join("cat1.jpg"));
        assert!(out.is_dir());
    }
}
