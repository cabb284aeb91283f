use crate::api::error::AppError;
use tempfile::NamedTempFile;

/// Writes an upload to a uniquely named temp file carrying the given
/// extension.
///
/// The returned guard deletes the file when it drops; deletion failures are
/// swallowed by the guard and never surface to the caller. The bytes are
/// fully written before the function returns, so the converter never sees a
/// partial file.
pub async fn stage_upload(data: &[u8], extension: &str) -> Result<NamedTempFile, AppError> {
    let suffix = format!(".{}", extension);
    let staged =
        tokio::task::spawn_blocking(move || tempfile::Builder::new().suffix(&suffix).tempfile())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(|e| AppError::Internal(e.to_string()))?;

    tokio::fs::write(staged.path(), data)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(staged)
}
