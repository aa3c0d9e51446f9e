//! Initialization options for the admin page's rich-text editor, with the
//! attachment upload endpoint and the anti-forgery header wired in.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::Config;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorConfig {
    pub ckfinder: UploadAdapterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadAdapterConfig {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,

    pub entity_index: String,
    pub entity_uuid: String,

    /// Headers the editor sends with each upload. A missing token is kept as
    /// `null` so the header name still shows up in the output.
    pub headers: BTreeMap<String, Option<String>>,
}

impl EditorConfig {
    /// Build the editor options from the project config. `upload_url` is used
    /// as written, so the page can keep a same-origin relative path.
    pub fn new(config: &Config, csrf_token: Option<&str>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            config.csrf.header_name.clone(),
            csrf_token.map(str::to_owned),
        );

        Self {
            ckfinder: UploadAdapterConfig {
                upload_url: config.upload.url.clone(),
                entity_index: config.upload.entity_index.clone(),
                entity_uuid: config.upload.entity_uuid.clone(),
                headers,
            },
        }
    }
}
