use crate::api::error::AppError;
use crate::services::staging::stage_upload;
use crate::utils::validation::{file_extension, sanitize_filename};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ConvertResponse {
    pub markdown: String,
}

/// Multipart failures keep their detail in the error source chain, not the
/// Display output; the status code is the reliable signal for an oversized
/// body.
fn map_multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge(
            "Request body exceeds the maximum allowed limit".to_string(),
        );
    }
    AppError::BadRequest(e.body_text())
}

#[utoipa::path(
    post,
    path = "/convert",
    request_body(content = String, content_type = "multipart/form-data", description = "Document to convert (form field `file`)"),
    responses(
        (status = 200, description = "Document converted successfully", body = ConvertResponse),
        (status = 400, description = "No file field in the request"),
        (status = 500, description = "Staging or conversion failure")
    ),
    tag = "convert"
)]
pub async fn convert_document(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, AppError> {
    // Use a result to capture errors so we can consume the multipart stream if needed
    let result: Result<Json<ConvertResponse>, AppError> = async {
        let mut upload: Option<(String, Bytes)> = None;

        while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let original_filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(map_multipart_error)?;
                upload = Some((original_filename, data));
            }
            // Other form fields are ignored.
        }

        let (original_filename, data) =
            upload.ok_or(AppError::BadRequest("No file provided".to_string()))?;

        // 1. Sanitize filename and derive the extension the converter
        //    dispatches on (generic `tmp` when the name carries none).
        let filename = sanitize_filename(&original_filename);
        let extension = file_extension(&filename);

        tracing::info!(
            "📄 Converting '{}' ({} bytes, .{})",
            filename,
            data.len(),
            extension
        );

        // 2. Stage to a uniquely named temp file. The guard removes the file
        //    when it drops, on every exit path below.
        let staged = stage_upload(&data, &extension).await?;

        // 3. Invoke the converter on the staged path. Opaque call; no retry.
        let markdown = state
            .converter
            .convert(staged.path())
            .await
            .map_err(|e| AppError::Conversion(e.to_string()))?;

        Ok(Json(ConvertResponse { markdown }))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // CRITICAL: Consume the remaining multipart stream to avoid TCP reset ("Network error" in browser)
            tracing::warn!(
                "Conversion request failed: {}. Consuming remaining stream...",
                e
            );
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}
