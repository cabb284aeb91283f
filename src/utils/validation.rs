use std::path::Path;

/// Sanitizes a client-supplied filename before any filesystem use.
/// Strips path components, replaces reserved characters and clamps the
/// length. An empty name is tolerated; the extension then falls back to the
/// generic default.
pub fn sanitize_filename(filename: &str) -> String {
    // Get only the filename component. Split on both separators: clients on
    // Windows send `\`-delimited paths that Path::file_name keeps whole.
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    // Check for path traversal attempts
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    // Remove dangerous characters, keep only safe ones
    // We allow most Unicode characters but block path separators and reserved characters
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Limit length safely for UTF-8
    if sanitized.len() > 255 {
        let mut end = 255;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized
    }
}

/// Extension of a sanitized filename, lower-cased. Defaults to `tmp` when
/// the name carries none, so the converter always has something to dispatch
/// on.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| "tmp".to_string())
}
