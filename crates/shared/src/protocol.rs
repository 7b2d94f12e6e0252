use serde::{Deserialize, Serialize};

use crate::{domain::RecordId, error::ApiError};

fn default_success() -> bool {
    true
}

/// Envelope returned by every company API endpoint.
///
/// A body without `success` is treated as a successful response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T> From<ApiError> for ApiResponse<T> {
    fn from(value: ApiError) -> Self {
        Self::failure(value.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<RecordId>,
}
