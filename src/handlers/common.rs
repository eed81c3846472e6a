use crate::errors::ServiceError;
use crate::{ApiResponse, PaginatedResponse};
use axum::{extract::Multipart, http::StatusCode, Json};
use serde::Serialize;
use std::collections::HashMap;

/// `201 Created` with the standard envelope
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// `200 OK` with the standard envelope
pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// `200 OK` carrying only a message
pub fn message(text: impl Into<String>) -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::OK, Json(ApiResponse::message(text.into())))
}

/// Wraps one page of a listing in the pagination envelope.
pub fn paginated<T: Serialize>(
    (items, total): (Vec<T>, u64),
    page: Option<u64>,
    limit: Option<u64>,
) -> (StatusCode, Json<ApiResponse<PaginatedResponse<T>>>) {
    let (page, limit) = crate::services::page_bounds(page, limit);
    ok(PaginatedResponse::new(items, total, page, limit))
}

/// A single file pulled from a multipart body, plus the plain text fields around it
#[derive(Debug, Default)]
pub struct UploadForm {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Reads a multipart body whose file part is named `file`.
pub async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, ServiceError> {
    let mut form = UploadForm::default();
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            form.filename = field.file_name().unwrap_or("upload").to_string();
            form.bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::BadRequest(format!("Failed to read upload: {}", e)))?
                .to_vec();
            has_file = true;
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| ServiceError::BadRequest(format!("Invalid form field: {}", e)))?;
            form.fields.insert(name, value);
        }
    }

    if !has_file {
        return Err(ServiceError::ValidationError(
            "Multipart field 'file' is required".to_string(),
        ));
    }
    Ok(form)
}
