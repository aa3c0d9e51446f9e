use secrecy::ExposeSecret;

use crate::{
    auth_cookie::get_csrf_token,
    editor_config::EditorConfig,
    options::{EditorConfigOptions, GlobalOptions},
};

use super::load_config;

pub fn editor_config(global: GlobalOptions, options: EditorConfigOptions) -> anyhow::Result<()> {
    let config = load_config(&global)?;

    let token = get_csrf_token(global.cookie.as_ref(), &config.csrf.cookie_name);
    if token.is_none() {
        log::warn!(
            "No '{}' cookie was found, {} will be null",
            config.csrf.cookie_name,
            config.csrf.header_name
        );
    }

    let editor = EditorConfig::new(
        &config,
        token.as_ref().map(|token| token.expose_secret().as_str()),
    );

    let output = if options.pretty {
        serde_json::to_string_pretty(&editor)?
    } else {
        serde_json::to_string(&editor)?
    };

    println!("{}", output);

    Ok(())
}
