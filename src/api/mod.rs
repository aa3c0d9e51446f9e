mod client;

use std::borrow::Cow;

use reqwest::StatusCode;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::CsrfConfig;

pub use self::client::ApiClient;

/// A file to hand to the editor's attachment upload endpoint.
#[derive(Debug, Clone)]
pub struct AttachmentUploadData<'a> {
    pub contents: Cow<'a, [u8]>,
    pub file_name: &'a str,
    pub entity_index: &'a str,
    pub entity_uuid: &'a str,
}

/// What a successful attachment upload hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub file_name: Option<String>,
}

/// Internal representation of what the upload endpoint returns, before we've
/// handled any errors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUploadResponse {
    uploaded: UploadedFlag,
    url: Option<String>,
    file_name: Option<String>,
    error: Option<RawUploadError>,
}

/// The upload adapter protocol allows both `true` and `1` here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadedFlag {
    Bool(bool),
    Int(u64),
}

impl UploadedFlag {
    fn is_set(&self) -> bool {
        match self {
            UploadedFlag::Bool(value) => *value,
            UploadedFlag::Int(value) => *value != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawUploadError {
    message: String,
}

impl RawUploadResponse {
    fn into_result(self) -> Result<UploadResponse, ApiError> {
        if !self.uploaded.is_set() {
            let message = self
                .error
                .map(|error| error.message)
                .unwrap_or_else(|| "upload was rejected without a message".to_owned());

            return Err(ApiError::UploadRejected { message });
        }

        // Some servers report success but still attach a warning.
        if let Some(error) = self.error {
            log::warn!("Upload succeeded with a warning: {}", error.message);
        }

        let url = self.url.ok_or(ApiError::MissingUploadUrl)?;

        Ok(UploadResponse {
            url,
            file_name: self.file_name,
        })
    }
}

/// The outcome of a plain form post.
#[derive(Debug, Clone)]
pub struct FormResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Clone, Debug)]
pub struct Credentials {
    /// Full `Cookie` header to send along, session cookie and token included.
    pub cookie: Option<SecretString>,

    pub csrf: CsrfConfig,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("Upload was rejected: {message}")]
    UploadRejected { message: String },

    #[error("Upload reported success but returned no URL")]
    MissingUploadUrl,

    #[error("Server returned success, but had malformed JSON response: {body}")]
    BadResponseJson {
        body: String,
        source: serde_json::Error,
    },

    #[error("Server returned HTTP {status} with body: {body}")]
    ResponseError { status: StatusCode, body: String },

    #[error("No '{cookie_name}' cookie was found, and a CSRF token is required")]
    MissingCsrfToken { cookie_name: String },

    #[error("'{name}' is not a valid HTTP header name")]
    InvalidHeaderName {
        name: String,
        source: reqwest::header::InvalidHeaderName,
    },

    #[error("The {what} contains characters that cannot be sent in an HTTP header")]
    InvalidHeaderValue {
        what: &'static str,
        source: reqwest::header::InvalidHeaderValue,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(body: &str) -> Result<UploadResponse, ApiError> {
        serde_json::from_str::<RawUploadResponse>(body)
            .unwrap()
            .into_result()
    }

    #[test]
    fn upload_success_with_bool_flag() {
        let response = parse(
            r#"{"uploaded": true, "url": "/media/kb/diagram.png", "fileName": "diagram.png"}"#,
        )
        .unwrap();

        assert_eq!(
            response,
            UploadResponse {
                url: "/media/kb/diagram.png".to_owned(),
                file_name: Some("diagram.png".to_owned()),
            }
        );
    }

    #[test]
    fn upload_success_with_int_flag() {
        let response = parse(r#"{"uploaded": 1, "url": "/media/kb/a.pdf"}"#).unwrap();

        assert_eq!(response.url, "/media/kb/a.pdf");
        assert_eq!(response.file_name, None);
    }

    #[test]
    fn upload_failure_surfaces_message() {
        match parse(r#"{"uploaded": false, "error": {"message": "File too large"}}"#) {
            Err(ApiError::UploadRejected { message }) => assert_eq!(message, "File too large"),
            other => panic!("unexpected result: {:?}", other),
        }

        match parse(r#"{"uploaded": 0}"#) {
            Err(ApiError::UploadRejected { .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn upload_success_without_url() {
        match parse(r#"{"uploaded": true}"#) {
            Err(ApiError::MissingUploadUrl) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
