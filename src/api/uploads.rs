// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File uploads. Only the metadata is kept; the bytes are discarded.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};

use crate::{error::ApiError, models::Upload, state::AppState};

/// Name given to uploads that arrive without a usable file name.
const DEFAULT_FILENAME: &str = "upload.bin";

/// Create an upload from a `file` part, or from a remote `url` field.
///
/// A `url` upload is recorded with the last path segment as its name and a
/// size of zero.
#[utoipa::path(
    post,
    path = "/uploads.json",
    request_body(content = String, content_type = "multipart/form-data"),
    tag = "Uploads",
    responses(
        (status = 200, body = Upload),
        (status = 400, description = "Body is not multipart/form-data"),
        (status = 422, description = "Neither a file nor a url was sent")
    )
)]
pub async fn create_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Upload>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let mut file: Option<(String, u64)> = None;
    let mut remote: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        match field.name() {
            Some("file") if file.is_none() => {
                let filename = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEFAULT_FILENAME)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                file = Some((filename, bytes.len() as u64));
            }
            Some("url") => {
                let url = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                remote = Some(url);
            }
            _ => {}
        }
    }

    let (filename, size) = match (file, remote) {
        (Some(file), _) => file,
        (None, Some(url)) if !url.trim().is_empty() => {
            let name = url
                .trim()
                .rsplit('/')
                .next()
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_FILENAME);
            (name.to_string(), 0)
        }
        _ => return Err(ApiError::unprocessable("file or url is required")),
    };

    let upload = state.store.write().await.create_upload(&filename, size)?;
    tracing::info!(
        upload_id = upload.id,
        filename = %upload.original_filename,
        size,
        "upload stored"
    );
    Ok(Json(upload))
}
