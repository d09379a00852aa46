//! Static renderer metadata.

use std::path::Path;

/// MIME type of a Rachis result archive in a render model.
pub const MIME_TYPE: &str = "application/vnd.rachis.archive+zip";

/// File type name shown by hosts.
pub const FILE_TYPE_NAME: &str = "Rachis Result (.qza/.qzv)";

/// Extensions of archive files (artifacts and visualizations).
pub const FILE_EXTENSIONS: &[&str] = &[".qza", ".qzv"];

/// Class added to the renderer's host element.
pub const CLASS_NAME: &str = "mimerenderer-rachis-archive";

/// Renderer rank; higher wins over generic renderers.
pub const RENDERER_RANK: u32 = 100;

/// The renderer never executes archive content in the host document.
pub const RENDERER_SAFE: bool = true;

/// Whether a path names an archive file. Case-insensitive.
pub fn is_archive_path(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    FILE_EXTENSIONS
        .iter()
        .any(|known| known.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
