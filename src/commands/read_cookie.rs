use anyhow::bail;
use secrecy::ExposeSecret;

use crate::{
    cookie,
    options::{GlobalOptions, ReadCookieOptions},
};

pub fn read_cookie(global: GlobalOptions, options: ReadCookieOptions) -> anyhow::Result<()> {
    let header = global
        .cookie
        .as_ref()
        .map(|header| header.expose_secret().as_str());

    if header.is_none() {
        log::warn!("No cookie header given; pass --cookie or set CSRFJAR_COOKIE");
    }

    match cookie::read_cookie(header, &options.name) {
        Some(value) => {
            println!("{}", value);
            Ok(())
        }
        None => bail!("No cookie named '{}' was found", options.name),
    }
}
