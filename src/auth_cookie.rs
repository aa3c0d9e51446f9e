//! Locating the anti-forgery token a Django site expects to be echoed back on
//! state-changing requests.

use reqwest::{
    header::{HeaderMap, SET_COOKIE},
    Client,
};
use secrecy::{ExposeSecret, SecretString};

use crate::cookie::{read_cookie, read_set_cookie};

/// Pull the token out of a cookie header given to us by the user.
pub fn get_csrf_token(
    cookie_header: Option<&SecretString>,
    cookie_name: &str,
) -> Option<SecretString> {
    let header = cookie_header?;

    read_cookie(Some(header.expose_secret().as_str()), cookie_name).map(SecretString::new)
}

/// Find the token cookie among a response's `Set-Cookie` headers, if the
/// server handed one out.
pub fn csrf_token_from_response(headers: &HeaderMap, cookie_name: &str) -> Option<SecretString> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| read_set_cookie(value, cookie_name))
        .map(SecretString::new)
}

/// Fetch a page from the site so that it sets a fresh token cookie.
pub fn fetch_csrf_token(
    client: &Client,
    url: &str,
    cookie_name: &str,
) -> reqwest::Result<Option<SecretString>> {
    log::debug!("Fetching {} to obtain a '{}' cookie", url, cookie_name);

    let response = client.get(url).send()?;

    Ok(csrf_token_from_response(response.headers(), cookie_name))
}
