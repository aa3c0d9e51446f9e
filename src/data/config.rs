use std::{
    io,
    path::{Path, PathBuf},
};

use fs_err as fs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub static CONFIG_FILENAME: &str = "csrfjar.toml";

/// Configuration for csrfjar, contained in a csrfjar.toml file.
///
/// Every field has a default, and a missing file is treated like an empty one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct Config {
    /// The site csrfjar talks to. Relative upload and post URLs are resolved
    /// against it, and it is fetched to obtain a fresh token cookie when none
    /// was given.
    pub base_url: String,

    pub csrf: CsrfConfig,
    pub upload: UploadConfig,
    pub post: PostConfig,

    /// The path that this config came from, if it was read from disk.
    #[serde(skip)]
    pub file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            csrf: CsrfConfig::default(),
            upload: UploadConfig::default(),
            post: PostConfig::default(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct CsrfConfig {
    /// Name of the cookie holding the anti-forgery token.
    pub cookie_name: String,

    /// Request header the server expects the token to be echoed back in.
    pub header_name: String,

    /// Form field the token is also sent as on urlencoded posts.
    pub form_field: String,

    /// Refuse to send state-changing requests without a token.
    pub require_token: bool,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "csrftoken".to_owned(),
            header_name: "X-CSRFTOKEN".to_owned(),
            form_field: "csrfmiddlewaretoken".to_owned(),
            require_token: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct UploadConfig {
    pub url: String,
    pub entity_index: String,
    pub entity_uuid: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            url: "/api/knowledgebase/attachments/".to_owned(),
            entity_index: "0".to_owned(),
            entity_uuid: "3af7c402-a00f-4c03-ad69-a43f92a1d064".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "snake_case")]
pub struct PostConfig {
    pub url: String,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            url: "/".to_owned(),
        }
    }
}

impl Config {
    /// Read a csrfjar.toml from the given folder, falling back to the default
    /// configuration if there is none.
    pub fn read_from_folder<P: AsRef<Path>>(folder_path: P) -> Result<Self, ConfigError> {
        let file_path = folder_path.as_ref().join(CONFIG_FILENAME);

        let contents = match fs::read(&file_path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!(
                    "No {} found at {}, using defaults",
                    CONFIG_FILENAME,
                    file_path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    source,
                    path: file_path,
                })
            }
        };

        let mut config = Self::from_toml(&contents).map_err(|source| ConfigError::Toml {
            source,
            path: file_path.clone(),
        })?;

        config.file_path = Some(file_path);
        Ok(config)
    }

    fn from_toml(contents: &[u8]) -> Result<Self, toml::de::Error> {
        toml::from_slice(contents)
    }

    /// Turn a possibly relative URL from the config or command line into an
    /// absolute one, rooted at `base_url`.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_owned();
        }

        // Protocol-relative URLs take the scheme of the base URL.
        if url.starts_with("//") {
            let scheme = match self.base_url.find("://") {
                Some(index) => &self.base_url[..index],
                None => "http",
            };

            return format!("{}:{}", scheme, url);
        }

        let base = self.base_url.trim_end_matches('/');

        if url.starts_with('/') {
            format!("{}{}", base, url)
        } else {
            format!("{}/{}", base, url)
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error deserializing TOML from path {}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("I/O error at path {}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}
