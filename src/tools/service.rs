//! Per-service configuration records
//!
//! A `ToolService` captures everything the pipeline needs to know about one
//! remote service, so the step sequence stays the same for any pair of
//! primary and dependent services.

use serde_json::{json, Value};

use super::{ToolError, ToolResult};
use crate::config::defaults::{
    DEFAULT_FILESTORE_ENDPOINT, DEFAULT_FILESTORE_TOOL, DEFAULT_IMAGE_ENDPOINT, DEFAULT_IMAGE_TOOL,
    FILESTORE_FALLBACK_STAGE, IMAGE_FALLBACK_STAGE,
};

/// Maps the step input (prompt text or upstream URL) to tool arguments
pub type ArgumentBuilder = fn(&str) -> Value;

/// Maps a raw tool result to the fields the pipeline uses
pub type ResultExtractor = fn(&ToolResult) -> Result<Artifact, ToolError>;

/// Fields extracted from a tool result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    /// Where the artifact can be fetched
    pub url: String,
    /// Stored file name, for services that persist the artifact
    pub file_name: Option<String>,
}

/// One remote tool service
#[derive(Debug, Clone)]
pub struct ToolService {
    /// Short name used in logs and stage messages
    pub name: String,
    pub endpoint: String,
    pub tool_name: String,
    pub build_arguments: ArgumentBuilder,
    pub extract_result: ResultExtractor,
    /// Stage reported when this service fails as a dependent step
    pub fallback_stage: String,
}

impl ToolService {
    /// Image generation service: prompt in, image URL out
    pub fn image(endpoint: Option<&str>) -> Self {
        Self {
            name: "image".to_string(),
            endpoint: endpoint.unwrap_or(DEFAULT_IMAGE_ENDPOINT).to_string(),
            tool_name: DEFAULT_IMAGE_TOOL.to_string(),
            build_arguments: image_arguments,
            extract_result: image_result,
            fallback_stage: IMAGE_FALLBACK_STAGE.to_string(),
        }
    }

    /// File storage service: source URL in, stored file name and public URL out
    pub fn filestore(endpoint: Option<&str>) -> Self {
        Self {
            name: "filestore".to_string(),
            endpoint: endpoint.unwrap_or(DEFAULT_FILESTORE_ENDPOINT).to_string(),
            tool_name: DEFAULT_FILESTORE_TOOL.to_string(),
            build_arguments: filestore_arguments,
            extract_result: filestore_result,
            fallback_stage: FILESTORE_FALLBACK_STAGE.to_string(),
        }
    }

    #[must_use]
    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    pub fn arguments(&self, input: &str) -> Value {
        (self.build_arguments)(input)
    }

    pub fn extract(&self, result: &ToolResult) -> Result<Artifact, ToolError> {
        (self.extract_result)(result)
    }
}

fn image_arguments(prompt: &str) -> Value {
    json!({ "prompt": prompt })
}

fn image_result(result: &ToolResult) -> Result<Artifact, ToolError> {
    let payload = result.json_payload()?;
    Ok(Artifact {
        url: required_str(&payload, "url")?,
        file_name: None,
    })
}

fn filestore_arguments(source_url: &str) -> Value {
    json!({ "sourceUrl": source_url, "makePublic": true })
}

fn filestore_result(result: &ToolResult) -> Result<Artifact, ToolError> {
    let payload = result.json_payload()?;
    Ok(Artifact {
        url: required_str(&payload, "url")?,
        file_name: Some(required_str(&payload, "filename")?),
    })
}

fn required_str(payload: &Value, field: &str) -> Result<String, ToolError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ToolError::UnexpectedResult(format!("missing `{field}` in {payload}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_service() {
        let service = ToolService::image(None);
        assert_eq!(service.endpoint, DEFAULT_IMAGE_ENDPOINT);
        assert_eq!(service.arguments("a red bicycle"), json!({"prompt": "a red bicycle"}));

        let artifact = service
            .extract(&ToolResult::text(r#"{"url":"https://x/img.png"}"#))
            .unwrap();
        assert_eq!(artifact.url, "https://x/img.png");
        assert_eq!(artifact.file_name, None);
    }

    #[test]
    fn test_filestore_service() {
        let service = ToolService::filestore(Some("https://files.local"));
        assert_eq!(service.endpoint, "https://files.local");
        assert_eq!(service.fallback_stage, "filestore-error");
        assert_eq!(
            service.arguments("https://x/img.png"),
            json!({"sourceUrl": "https://x/img.png", "makePublic": true})
        );

        let artifact = service
            .extract(&ToolResult::text(r#"{"filename":"f123","url":"https://cdn/f123"}"#))
            .unwrap();
        assert_eq!(artifact.url, "https://cdn/f123");
        assert_eq!(artifact.file_name.as_deref(), Some("f123"));
    }

    #[test]
    fn test_extract_rejects_missing_fields() {
        let service = ToolService::filestore(None);
        let err = service.extract(&ToolResult::text(r#"{"url":"https://cdn/f"}"#)).unwrap_err();
        assert!(err.to_string().contains("filename"));

        let err = ToolService::image(None)
            .extract(&ToolResult::text("plain text"))
            .unwrap_err();
        assert!(matches!(err, ToolError::Serialization(_)));
    }

    #[test]
    fn test_with_tool_name() {
        let service = ToolService::image(None).with_tool_name("image_v2");
        assert_eq!(service.tool_name, "image_v2");
    }
}
