use crate::startup::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Map, Value};
use service_core::error::AppError;

pub const ALLOWED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

struct UploadedImage {
    file_name: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct AnalyzeForm {
    image: Option<UploadedImage>,
    prompt: Option<String>,
    models: Vec<String>,
}

pub async fn analyze_medical_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let max_mb = state.config.limits.max_upload_megabytes();
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(AppError::PayloadTooLarge(max_mb));
        }
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Request is not multipart");
            return Err(no_image());
        }
    };
    let form = read_form(multipart, max_mb).await?;

    let image = form.image.ok_or_else(no_image)?;
    let prompt = form
        .prompt
        .ok_or_else(|| AppError::Validation("No analysis prompt provided".to_string()))?;

    if image.file_name.is_empty() {
        return Err(AppError::Validation("No image file selected".to_string()));
    }

    if !has_allowed_extension(&image.file_name) {
        return Err(AppError::Validation(format!(
            "Unsupported file type. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    tracing::info!(
        prompt = %prompt.chars().take(50).collect::<String>(),
        file_name = %image.file_name,
        size = image.data.len(),
        "Received analysis request"
    );

    let requested = (!form.models.is_empty()).then_some(form.models.as_slice());
    let outcome = state
        .orchestrator
        .analyze_input(Some(image.data), &prompt, requested)
        .await?;

    let results: Map<String, Value> = outcome
        .results
        .iter()
        .map(|result| {
            let value = serde_json::to_value(result).map_err(anyhow::Error::from)?;
            Ok((result.model_key.clone(), value))
        })
        .collect::<Result<_, AppError>>()?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "results": results,
            "prompt": prompt,
            "timestamp": outcome.timestamp,
        })),
    ))
}

async fn read_form(mut multipart: Multipart, max_mb: usize) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_mb))?
    {
        match field.name() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_mb))?
                    .to_vec();
                form.image = Some(UploadedImage { file_name, data });
            }
            Some("prompt") => {
                form.prompt = Some(field.text().await.map_err(|e| multipart_error(e, max_mb))?);
            }
            Some("models") => {
                let raw = field.text().await.map_err(|e| multipart_error(e, max_mb))?;
                form.models.extend(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|key| !key.is_empty())
                        .map(str::to_string),
                );
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unexpected multipart field");
            }
        }
    }

    Ok(form)
}

fn no_image() -> AppError {
    AppError::Validation("No image file provided".to_string())
}

fn multipart_error(err: MultipartError, max_mb: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(max_mb)
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// Case-insensitive check of whatever follows the last `.` in the file name.
pub fn has_allowed_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}
