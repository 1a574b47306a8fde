use crate::engine::InfernumEngineResponse;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DescribeResponse {
    pub id: u64,
    pub mode: String,
    pub prompt: Option<String>,
    pub image: ImageInfo,
    pub duration: Duration,
    pub response: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageInfo {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<InfernumEngineResponse> for DescribeResponse {
    fn from(result: InfernumEngineResponse) -> Self {
        let metadata = result.request_metadata;
        let (width, height) = metadata.image_size;
        Self {
            id: result.id,
            mode: metadata.mode.as_str().to_string(),
            prompt: metadata.prompt,
            image: ImageInfo {
                mime_type: metadata.mime_type.to_string(),
                width,
                height,
            },
            duration: result.duration,
            response: result.response,
        }
    }
}
