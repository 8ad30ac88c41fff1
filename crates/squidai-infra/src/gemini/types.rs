//! Gemini Generative Language API types.
//!
//! Request bodies are built from these structs. Responses are walked as
//! `serde_json::Value` by the streaming normalizer because the API answers
//! in several envelope shapes; only the image and error payloads are
//! deserialized into structs.

use serde::{Deserialize, Serialize};

/// Request body for `generateContent` / `streamGenerateContent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// One conversation entry.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

// ---------------------------------------------------------------------------
// Image response
//
// The API has returned both camelCase (`inlineData`) and snake_case
// (`inline_data`) part keys; serde aliases accept either.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageResponse {
    #[serde(default)]
    pub candidates: Vec<ImageCandidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageCandidate {
    #[serde(default)]
    pub content: Option<ImageContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageContent {
    #[serde(default)]
    pub parts: Vec<ImagePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "inlineData", alias = "inline_data")]
    pub inline_data: Option<ImageData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageData {
    #[serde(default, rename = "mimeType", alias = "mime_type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

// ---------------------------------------------------------------------------
// Error envelope: `{ "error": { code, message, status, details } }`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                    Part::Text {
                        text: "what is this?".to_string(),
                    },
                ],
            }],
            generation_config: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inline_data"]["mime_type"], "image/png");
        assert_eq!(json["contents"][0]["parts"][1]["text"], "what is this?");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_generation_config_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content::text("user", "a cat")],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["responseModalities"][1], "IMAGE");
    }

    #[test]
    fn test_image_part_accepts_both_casings() {
        let camel: ImagePart =
            serde_json::from_str(r#"{"inlineData":{"mimeType":"image/jpeg","data":"x"}}"#).unwrap();
        let snake: ImagePart =
            serde_json::from_str(r#"{"inline_data":{"mime_type":"image/png","data":"y"}}"#).unwrap();
        assert_eq!(camel.inline_data.unwrap().mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(snake.inline_data.unwrap().data.as_deref(), Some("y"));
    }
}
