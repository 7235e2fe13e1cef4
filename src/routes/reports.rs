use axum::{
    extract::Multipart,
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, AppResult};
use crate::report;

/// Accepts a multipart CSV upload and responds with the generated PDF as an
/// attachment. Generation failures surface their message in the error body.
pub async fn create_report(mut multipart: Multipart) -> AppResult<Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::Validation("No file selected".into()));
        }
        if !filename.to_lowercase().ends_with(".csv") {
            return Err(AppError::Validation("Please upload a CSV file".into()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;

        let pdf = report::generate(&data)?;

        return Ok((
            [
                (header::CONTENT_TYPE, "application/pdf".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"report.pdf\"".to_string(),
                ),
            ],
            pdf,
        )
            .into_response());
    }

    Err(AppError::Validation("No file selected".into()))
}
