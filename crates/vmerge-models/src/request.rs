//! Merge request descriptor.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// Background volume used when the descriptor omits it.
pub const DEFAULT_BACKGROUND_VOLUME: f64 = 0.5;

/// JSON merge descriptor submitted with a merge call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct MergeRequest {
    /// Source videos, concatenated in this order
    #[validate(
        length(min = 1, message = "at least one video URL is required"),
        custom(function = "validate_video_urls")
    )]
    pub video_urls: Vec<String>,

    /// Optional background music, looped or trimmed to the video length
    #[serde(default)]
    #[validate(custom(function = "validate_audio_url"))]
    pub background_audio_url: Option<String>,

    /// Linear gain applied to the background track
    #[serde(default = "default_volume", deserialize_with = "volume_or_default")]
    #[validate(custom(function = "validate_volume"))]
    pub background_volume: f64,

    /// Hand the artifact to remote storage after export
    #[serde(default, deserialize_with = "flag_or_default")]
    pub upload_to_drive: bool,
}

/// Errors produced while decoding a merge descriptor.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Malformed merge request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid merge request: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl MergeRequest {
    /// Decode and validate a descriptor from its JSON text.
    ///
    /// An empty background URL is treated as absent.
    pub fn from_json(text: &str) -> Result<Self, RequestError> {
        let mut request: MergeRequest = serde_json::from_str(text)?;
        if request
            .background_audio_url
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            request.background_audio_url = None;
        }
        request.validate()?;
        Ok(request)
    }

    /// Apply an out-of-band upload flag, which wins over the JSON body.
    pub fn apply_upload_override(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            self.upload_to_drive = parse_upload_override(value);
        }
    }

    /// Background URL, if one was supplied.
    pub fn background_url(&self) -> Option<&str> {
        self.background_audio_url.as_deref()
    }
}

/// Interpret an out-of-band upload flag: only `"true"` (any case) enables upload.
pub fn parse_upload_override(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

fn default_volume() -> f64 {
    DEFAULT_BACKGROUND_VOLUME
}

fn volume_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_BACKGROUND_VOLUME))
}

fn flag_or_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn validate_video_urls(urls: &[String]) -> Result<(), ValidationError> {
    for url in urls {
        check_http_url(url)?;
    }
    Ok(())
}

fn validate_audio_url(url: &str) -> Result<(), ValidationError> {
    check_http_url(url)
}

fn check_http_url(raw: &str) -> Result<(), ValidationError> {
    let parsed = url::Url::parse(raw).map_err(|_| {
        let mut err = ValidationError::new("url");
        err.message = Some(format!("not a valid URL: {raw}").into());
        err
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => {
            let mut err = ValidationError::new("url_scheme");
            err.message = Some(format!("unsupported URL scheme '{other}': {raw}").into());
            Err(err)
        }
    }
}

// Gain is unbounded linear; only non-finite values are refused.
fn validate_volume(volume: f64) -> Result<(), ValidationError> {
    if volume.is_finite() {
        Ok(())
    } else {
        let mut err = ValidationError::new("volume");
        err.message = Some("background_volume must be a finite number".into());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let req = MergeRequest::from_json(r#"{"video_urls": ["https://a.test/1.mp4"]}"#).unwrap();

        assert_eq!(req.video_urls.len(), 1);
        assert!(req.background_audio_url.is_none());
        assert!((req.background_volume - 0.5).abs() < f64::EPSILON);
        assert!(!req.upload_to_drive);
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let req = MergeRequest::from_json(
            r#"{"video_urls": ["https://a.test/1.mp4"], "background_audio_url": null,
                "background_volume": null, "upload_to_drive": null}"#,
        )
        .unwrap();

        assert!((req.background_volume - DEFAULT_BACKGROUND_VOLUME).abs() < f64::EPSILON);
        assert!(!req.upload_to_drive);
    }

    #[test]
    fn test_empty_background_url_is_absent() {
        let req = MergeRequest::from_json(
            r#"{"video_urls": ["https://a.test/1.mp4"], "background_audio_url": ""}"#,
        )
        .unwrap();
        assert!(req.background_url().is_none());
    }

    #[test]
    fn test_empty_video_list_rejected() {
        let err = MergeRequest::from_json(r#"{"video_urls": []}"#).unwrap_err();
        assert!(matches!(err, RequestError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = MergeRequest::from_json("{not json").unwrap_err();
        assert!(matches!(err, RequestError::Malformed(_)));
    }

    #[test]
    fn test_non_http_url_rejected() {
        let err = MergeRequest::from_json(r#"{"video_urls": ["file:///etc/passwd"]}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported URL scheme"));
    }

    #[test]
    fn test_out_of_range_volume_accepted() {
        let req = MergeRequest::from_json(
            r#"{"video_urls": ["https://a.test/1.mp4"], "background_volume": 1.5}"#,
        )
        .unwrap();
        assert!((req.background_volume - 1.5).abs() < f64::EPSILON);

        let req = MergeRequest::from_json(
            r#"{"video_urls": ["https://a.test/1.mp4"], "background_volume": -0.25}"#,
        )
        .unwrap();
        assert!(req.background_volume < 0.0);
    }

    #[test]
    fn test_non_finite_volume_rejected() {
        let mut req = MergeRequest::from_json(r#"{"video_urls": ["https://a.test/1.mp4"]}"#).unwrap();

        req.background_volume = f64::NAN;
        assert!(req.validate().is_err());

        req.background_volume = f64::INFINITY;
        assert!(req.validate().is_err());

        req.background_volume = 0.0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_upload_override_takes_precedence() {
        let mut req = MergeRequest::from_json(
            r#"{"video_urls": ["https://a.test/1.mp4"], "upload_to_drive": true}"#,
        )
        .unwrap();

        req.apply_upload_override(None);
        assert!(req.upload_to_drive);

        req.apply_upload_override(Some("false"));
        assert!(!req.upload_to_drive);

        req.apply_upload_override(Some("TRUE"));
        assert!(req.upload_to_drive);

        req.apply_upload_override(Some("yes"));
        assert!(!req.upload_to_drive);
    }
}
