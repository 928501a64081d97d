//! Preview image resolution.
//!
//! For an existing chapter directory this never fails outright: the fallback
//! chain ends in a synthesized placeholder, so the UI always has something
//! to show. Only a missing chapter directory is an error.

use std::path::Path;

use tracing::debug;

use lc_common::error::CommonError;
use lc_common::render;

use crate::error::AppError;

/// Cache lifetime advertised for real preview files.
pub const CACHE_LONG_SECS: u64 = 3600;
/// Shorter lifetime for synthesized placeholders, so a newly added preview
/// file becomes visible quickly.
pub const CACHE_SHORT_SECS: u64 = 60;

/// Alternate preview extensions, tried in this fixed order after
/// `preview.png`.
const ALT_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "webp", "gif"];
/// Extensions accepted when falling back to any image in the directory.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub cache_max_age: u64,
}

/// Resolve a preview for the chapter in `chapter_dir`.
///
/// Fallback order: `preview.png`, then `preview.{jpg,jpeg,webp,gif}`, then
/// the first directory entry with an image extension, then a synthesized
/// placeholder carrying the chapter id.
pub fn resolve_preview(chapter_dir: &Path, id: &str) -> Result<Preview, AppError> {
    if !chapter_dir.is_dir() {
        return Err(AppError::chapter_not_found());
    }

    let canonical = chapter_dir.join("preview.png");
    if canonical.exists() {
        return file_preview(&canonical, "image/png");
    }

    for ext in ALT_EXTENSIONS {
        let path = chapter_dir.join(format!("preview.{ext}"));
        if path.exists() {
            return file_preview(&path, content_type_for(ext));
        }
    }

    // Any image in the directory, enumeration order.
    for entry in std::fs::read_dir(chapter_dir).map_err(CommonError::Io)? {
        let entry = entry.map_err(CommonError::Io)?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if let Some(ext) = IMAGE_EXTENSIONS
            .iter()
            .find(|ext| name.ends_with(&format!(".{ext}")))
        {
            debug!(chapter = %id, file = %name, "using directory image as preview");
            return file_preview(&entry.path(), content_type_for(ext));
        }
    }

    debug!(chapter = %id, "no preview image, synthesizing placeholder");
    Ok(Preview {
        bytes: placeholder_png(id)?,
        content_type: "image/png",
        cache_max_age: CACHE_SHORT_SECS,
    })
}

fn file_preview(path: &Path, content_type: &'static str) -> Result<Preview, AppError> {
    let bytes = std::fs::read(path).map_err(CommonError::Io)?;
    Ok(Preview {
        bytes,
        content_type,
        cache_max_age: CACHE_LONG_SECS,
    })
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// A slate-blue card naming the chapter, in place of a real preview.
fn placeholder_png(id: &str) -> Result<Vec<u8>, AppError> {
    let mut img = render::solid(400, 300, [73, 109, 137]);
    render::draw_text(&mut img, 10, 10, &format!("CHAPTER: {id}"), 2, [255, 255, 0]);
    render::draw_text(&mut img, 10, 50, "NO PREVIEW AVAILABLE", 2, [255, 255, 0]);
    render::encode_png(&img).map_err(AppError::Common)
}
