use crate::options::{GlobalOptions, PostFormOptions};

use super::{connect, load_config};

pub fn post_form(global: GlobalOptions, options: PostFormOptions) -> anyhow::Result<()> {
    let config = load_config(&global)?;
    let url = config.resolve_url(options.url.as_deref().unwrap_or(&config.post.url));

    let mut client = connect(global, &config, options.require_token)?;

    let response = client.post_form(&url, &options.fields)?;

    log::info!("POST {} returned {}", url, response.status);
    log::info!("{}", response.body);

    Ok(())
}
