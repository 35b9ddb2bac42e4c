//! MIME type detection module
//!
//! Returns the Content-Type for a file based on its extension.

use std::path::Path;

/// Content type used when the extension is unknown; forces a download
pub const FORCE_DOWNLOAD: &str = "application/force-download";

/// Get MIME Content-Type based on file extension (case-insensitive)
///
/// # Examples
/// ```
/// use filestream::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("PNG")), "image/png");
/// assert_eq!(get_content_type(Some("mp4")), "application/force-download");
/// assert_eq!(get_content_type(None), "application/force-download");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let Some(ext) = extension else {
        return FORCE_DOWNLOAD;
    };

    match ext.to_ascii_lowercase().as_str() {
        // Text
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "txt" | "php" => "text/plain",

        // Scripts and data
        "js" => "application/javascript",
        "json" => "application/json",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",

        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",

        // Documents and archives
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "exe" => "application/octet-stream",
        "doc" => "application/msword",
        "xls" => "application/vnd.ms-excel",
        "ppt" => "application/vnd.ms-powerpoint",

        _ => FORCE_DOWNLOAD,
    }
}

/// Resolve the Content-Type for a file
///
/// An explicit, non-empty override always wins. Otherwise the extension of
/// `path` is looked up.
pub fn resolve(path: &Path, override_type: Option<&str>) -> String {
    if let Some(explicit) = override_type.filter(|t| !t.trim().is_empty()) {
        return explicit.trim().to_string();
    }
    get_content_type(extension(path)).to_string()
}

/// Text after the last `.` of the file name
///
/// Unlike [`Path::extension`], a dotfile such as `.png` has the extension
/// `png`.
fn extension(path: &Path) -> Option<&str> {
    path.file_name()?
        .to_str()?
        .rsplit_once('.')
        .map(|(_, ext)| ext)
}

/// Whether a resolved type is the force-download fallback
pub fn is_force_download(content_type: &str) -> bool {
    content_type.eq_ignore_ascii_case(FORCE_DOWNLOAD)
}
