use rocket::http::Status;
use serde_json::json;
use std::io::Cursor;

use crate::aura::AuraError;
use crate::images::ImageProxyError;

#[derive(Debug)]
pub enum ApiError {
    /// Image endpoint called without a `url` parameter.
    MissingImageUrl,
    /// Aura endpoint called without a name.
    MissingName,
    ImageError(ImageProxyError),
    AuraError(AuraError),
}

impl From<ImageProxyError> for ApiError {
    fn from(error: ImageProxyError) -> Self {
        ApiError::ImageError(error)
    }
}

impl From<AuraError> for ApiError {
    fn from(error: AuraError) -> Self {
        ApiError::AuraError(error)
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        match self {
            ApiError::MissingImageUrl => rocket::Response::build()
                .status(Status::BadRequest)
                .sized_body(None, Cursor::new("Missing image URL"))
                .ok(),
            ApiError::ImageError(ImageProxyError::BlockedHost(host)) => rocket::Response::build()
                .status(Status::Forbidden)
                .sized_body(None, Cursor::new(format!("Host not allowed: {}", host)))
                .ok(),
            ApiError::ImageError(ImageProxyError::NetworkError(_))
            | ApiError::ImageError(ImageProxyError::UpstreamError(_)) => rocket::Response::build()
                .status(Status::InternalServerError)
                .sized_body(None, Cursor::new("Failed to fetch image"))
                .ok(),
            ApiError::ImageError(ImageProxyError::ConversionError(_)) => rocket::Response::build()
                .status(Status::InternalServerError)
                .sized_body(None, Cursor::new("Error processing image"))
                .ok(),
            ApiError::MissingName => {
                let body = json!({
                    "error": "No name provided"
                })
                .to_string();

                rocket::Response::build()
                    .status(Status::BadRequest)
                    .sized_body(None, Cursor::new(body))
                    .ok()
            }
            ApiError::AuraError(error) => {
                let body = json!({
                    "error": error.to_string()
                })
                .to_string();

                rocket::Response::build()
                    .status(Status::InternalServerError)
                    .sized_body(None, Cursor::new(body))
                    .ok()
            }
        }
    }
}
