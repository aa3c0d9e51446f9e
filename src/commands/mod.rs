mod editor_config;
mod post_form;
mod read_cookie;
mod upload_attachment;

pub use editor_config::*;
pub use post_form::*;
pub use read_cookie::*;
pub use upload_attachment::*;

use std::env;

use crate::{
    api::{ApiClient, Credentials},
    data::Config,
    options::GlobalOptions,
};

fn load_config(global: &GlobalOptions) -> anyhow::Result<Config> {
    let folder = match &global.config {
        Some(folder) => folder.clone(),
        None => env::current_dir()?,
    };

    let config = Config::read_from_folder(folder)?;

    if let Some(path) = &config.file_path {
        log::debug!("Using config from {}", path.display());
    }

    Ok(config)
}

/// Set up an API client for a state-changing command, fetching a token from
/// the site if the cookie header didn't carry one.
fn connect(
    global: GlobalOptions,
    config: &Config,
    require_token: bool,
) -> anyhow::Result<ApiClient> {
    let mut csrf = config.csrf.clone();
    csrf.require_token |= require_token;

    let credentials = Credentials {
        cookie: global.cookie,
        csrf,
    };

    Ok(ApiClient::new(credentials, &config.resolve_url("/"))?)
}
