use std::fmt;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, COOKIE},
    multipart::{Form, Part},
    Client, Request, Response, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth_cookie::{csrf_token_from_response, fetch_csrf_token, get_csrf_token},
    cookie::with_cookie,
    data::CsrfConfig,
};

use super::{
    ApiError, AttachmentUploadData, Credentials, FormResponse, RawUploadResponse, UploadResponse,
};

/// Blocking client that sends the session cookie and the anti-forgery token
/// along with every request.
pub struct ApiClient {
    credentials: Credentials,
    csrf_header: HeaderName,
    csrf_token: Option<SecretString>,
    client: Client,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "ApiClient")
    }
}

impl ApiClient {
    /// Set up a client from the given credentials. If they carry no token,
    /// `prime_url` is fetched so that the server sets one.
    pub fn new(credentials: Credentials, prime_url: &str) -> Result<Self, ApiError> {
        let client = Client::new();

        let csrf_header = HeaderName::from_bytes(credentials.csrf.header_name.as_bytes())
            .map_err(|source| ApiError::InvalidHeaderName {
                name: credentials.csrf.header_name.clone(),
                source,
            })?;

        let user_token =
            get_csrf_token(credentials.cookie.as_ref(), &credentials.csrf.cookie_name);

        let token_source = resolve_token(&credentials.csrf, user_token, || {
            match fetch_csrf_token(&client, prime_url, &credentials.csrf.cookie_name) {
                Ok(token) => token,
                Err(err) => {
                    log::error!("Was unable to fetch CSRF token: {}", err);
                    None
                }
            }
        })?;

        let mut api_client = Self {
            credentials,
            csrf_header,
            csrf_token: None,
            client,
        };

        match token_source {
            // The user's cookie header already carries this token, so it is
            // sent exactly as given.
            TokenSource::CookieHeader(token) => api_client.csrf_token = Some(token),
            TokenSource::Primed(token) => api_client.set_csrf_token(token),
            TokenSource::Missing => log::warn!(
                "No '{}' cookie was found, requests will be sent without a {} header",
                api_client.credentials.csrf.cookie_name,
                api_client.credentials.csrf.header_name
            ),
        }

        Ok(api_client)
    }

    /// Upload a file through the editor's attachment endpoint.
    pub fn upload_attachment(
        &mut self,
        url: &str,
        data: &AttachmentUploadData,
    ) -> Result<UploadResponse, ApiError> {
        let mut response = self.execute_with_csrf_retry(|client, _token| {
            let part = Part::bytes(data.contents.clone().into_owned())
                .file_name(data.file_name.to_owned());

            let form = Form::new()
                .text("entity_index", data.entity_index.to_owned())
                .text("entity_uuid", data.entity_uuid.to_owned())
                .part("upload", part);

            Ok(client.post(url).multipart(form).build()?)
        })?;

        let body = response.text()?;

        // Some errors will be reported through HTTP status codes, handled here.
        // The rest come back inside a successful response.
        if response.status().is_success() {
            match serde_json::from_str::<RawUploadResponse>(&body) {
                Ok(raw) => raw.into_result(),
                Err(source) => Err(ApiError::BadResponseJson { body, source }),
            }
        } else {
            Err(ApiError::ResponseError {
                status: response.status(),
                body,
            })
        }
    }

    /// Post a urlencoded form, with the token added under the configured form
    /// field when one is known.
    pub fn post_form(
        &mut self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<FormResponse, ApiError> {
        let form_field = self.credentials.csrf.form_field.clone();

        let mut response = self.execute_with_csrf_retry(|client, token| {
            let form = form_fields(fields, &form_field, token);

            Ok(client.post(url).form(&form).build()?)
        })?;

        let body = response.text()?;
        let status = response.status();

        if status.is_success() {
            Ok(FormResponse { status, body })
        } else {
            Err(ApiError::ResponseError { status, body })
        }
    }

    fn exposed_token(&self) -> Option<&str> {
        self.csrf_token
            .as_ref()
            .map(|token| token.expose_secret().as_str())
    }

    /// Adopt a token the server handed out, writing it into the Cookie header
    /// as well so that the cookie and the anti-forgery header agree.
    fn set_csrf_token(&mut self, token: SecretString) {
        let cookie = with_cookie(
            self.credentials
                .cookie
                .as_ref()
                .map(|cookie| cookie.expose_secret().as_str()),
            &self.credentials.csrf.cookie_name,
            token.expose_secret(),
        );

        self.credentials.cookie = Some(SecretString::new(cookie));
        self.csrf_token = Some(token);
    }

    /// Execute a request generated by the given function, retrying once if
    /// the server rejects it and hands out a fresh token cookie. The function
    /// receives the token the request will be sent with.
    fn execute_with_csrf_retry<F>(&mut self, make_request: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client, Option<&str>) -> Result<Request, ApiError>,
    {
        let mut request = make_request(&self.client, self.exposed_token())?;
        self.attach_headers(&mut request)?;

        let response = self.client.execute(request)?;

        let refreshed = refreshed_token(
            response.status(),
            response.headers(),
            &self.credentials.csrf.cookie_name,
        );

        match refreshed {
            Some(token) => {
                log::debug!("Retrying request with a fresh CSRF token...");

                self.set_csrf_token(token);

                let mut new_request = make_request(&self.client, self.exposed_token())?;
                self.attach_headers(&mut new_request)?;

                Ok(self.client.execute(new_request)?)
            }
            None => Ok(response),
        }
    }

    /// Attach the session cookie and the anti-forgery header to a request.
    fn attach_headers(&self, request: &mut Request) -> Result<(), ApiError> {
        if let Some(cookie) = &self.credentials.cookie {
            let mut value = HeaderValue::from_str(cookie.expose_secret()).map_err(|source| {
                ApiError::InvalidHeaderValue {
                    what: "cookie header",
                    source,
                }
            })?;
            value.set_sensitive(true);

            request.headers_mut().insert(COOKIE, value);
        }

        if let Some(token) = &self.csrf_token {
            let mut value = HeaderValue::from_str(token.expose_secret()).map_err(|source| {
                ApiError::InvalidHeaderValue {
                    what: "CSRF token",
                    source,
                }
            })?;
            value.set_sensitive(true);

            request.headers_mut().insert(self.csrf_header.clone(), value);
        }

        Ok(())
    }
}

/// Where the token requests are sent with came from.
#[derive(Debug)]
enum TokenSource {
    /// Read from the cookie header the user supplied.
    CookieHeader(SecretString),

    /// Handed out by the site when it was fetched.
    Primed(SecretString),

    /// Neither, and the config allows going without.
    Missing,
}

/// Pick the token to send: the one in the user's cookie header, else one
/// obtained from `prime`. `prime` only runs when the header has none.
fn resolve_token<P>(
    csrf: &CsrfConfig,
    from_cookie_header: Option<SecretString>,
    prime: P,
) -> Result<TokenSource, ApiError>
where
    P: FnOnce() -> Option<SecretString>,
{
    if let Some(token) = from_cookie_header {
        return Ok(TokenSource::CookieHeader(token));
    }

    match prime() {
        Some(token) => Ok(TokenSource::Primed(token)),
        None if csrf.require_token => Err(ApiError::MissingCsrfToken {
            cookie_name: csrf.cookie_name.clone(),
        }),
        None => Ok(TokenSource::Missing),
    }
}

/// The token to retry a request with. Only a 403 that sets a new token cookie
/// earns a retry; any other 403 was forbidden for other reasons.
fn refreshed_token(
    status: StatusCode,
    headers: &HeaderMap,
    cookie_name: &str,
) -> Option<SecretString> {
    if status != StatusCode::FORBIDDEN {
        return None;
    }

    csrf_token_from_response(headers, cookie_name)
}

/// Fields for a form post: the caller's own fields, then the token field. A
/// caller-supplied token field is left alone.
fn form_fields(
    fields: &[(String, String)],
    form_field: &str,
    token: Option<&str>,
) -> Vec<(String, String)> {
    let mut form = fields.to_vec();

    if let Some(token) = token {
        if !fields.iter().any(|(key, _)| key == form_field) {
            form.push((form_field.to_owned(), token.to_owned()));
        }
    }

    form
}

#[cfg(test)]
mod test {
    use super::*;

    use std::cell::Cell;

    use reqwest::header::SET_COOKIE;

    fn csrf_config(require_token: bool) -> CsrfConfig {
        CsrfConfig {
            require_token,
            ..CsrfConfig::default()
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::new(value.to_owned())
    }

    fn sent_headers(client: &ApiClient) -> HeaderMap {
        let mut request = client
            .client
            .post("http://localhost:8000/")
            .build()
            .unwrap();
        client.attach_headers(&mut request).unwrap();

        request.headers().clone()
    }

    #[test]
    fn cookie_header_token_skips_priming() {
        let primed = Cell::new(false);

        let source = resolve_token(&csrf_config(true), Some(secret("user")), || {
            primed.set(true);
            Some(secret("server"))
        })
        .unwrap();

        match source {
            TokenSource::CookieHeader(token) => assert_eq!(token.expose_secret(), "user"),
            other => panic!("unexpected token source: {:?}", other),
        }
        assert!(!primed.get());
    }

    #[test]
    fn primed_token_used_when_header_has_none() {
        match resolve_token(&csrf_config(false), None, || Some(secret("server"))).unwrap() {
            TokenSource::Primed(token) => assert_eq!(token.expose_secret(), "server"),
            other => panic!("unexpected token source: {:?}", other),
        }
    }

    #[test]
    fn missing_token_allowed_by_default() {
        match resolve_token(&csrf_config(false), None, || None).unwrap() {
            TokenSource::Missing => {}
            other => panic!("unexpected token source: {:?}", other),
        }
    }

    #[test]
    fn missing_token_rejected_when_required() {
        match resolve_token(&csrf_config(true), None, || None) {
            Err(ApiError::MissingCsrfToken { cookie_name }) => {
                assert_eq!(cookie_name, "csrftoken")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn retry_only_on_forbidden_with_new_token() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("csrftoken=fresh; Path=/"));

        let token = refreshed_token(StatusCode::FORBIDDEN, &headers, "csrftoken");
        assert_eq!(
            token.map(|token| token.expose_secret().clone()),
            Some("fresh".to_owned())
        );

        assert!(refreshed_token(StatusCode::OK, &headers, "csrftoken").is_none());
        assert!(refreshed_token(StatusCode::BAD_REQUEST, &headers, "csrftoken").is_none());
        assert!(refreshed_token(StatusCode::FORBIDDEN, &HeaderMap::new(), "csrftoken").is_none());
    }

    #[test]
    fn user_cookie_header_sent_unchanged() {
        let header = "csrftoken=first%2Fa%2Bb; sessionid=s; csrftoken=second";
        let credentials = Credentials {
            cookie: Some(secret(header)),
            csrf: csrf_config(true),
        };

        let client = ApiClient::new(credentials, "http://localhost:8000/").unwrap();
        let headers = sent_headers(&client);

        assert_eq!(headers.get(COOKIE).unwrap().to_str().unwrap(), header);
        assert_eq!(
            headers.get("X-CSRFTOKEN").unwrap().to_str().unwrap(),
            "first/a+b"
        );
    }

    #[test]
    fn refreshed_token_rewrites_cookie_header() {
        let credentials = Credentials {
            cookie: Some(secret("sessionid=s; csrftoken=stale")),
            csrf: csrf_config(true),
        };

        let mut client = ApiClient::new(credentials, "http://localhost:8000/").unwrap();
        client.set_csrf_token(secret("fresh"));
        let headers = sent_headers(&client);

        assert_eq!(
            headers.get(COOKIE).unwrap().to_str().unwrap(),
            "sessionid=s; csrftoken=fresh"
        );
        assert_eq!(headers.get("X-CSRFTOKEN").unwrap().to_str().unwrap(), "fresh");
    }

    fn pair(key: &str, value: &str) -> (String, String) {
        (key.to_owned(), value.to_owned())
    }

    #[test]
    fn token_appended_to_form() {
        let fields = vec![pair("title", "hello")];

        assert_eq!(
            form_fields(&fields, "csrfmiddlewaretoken", Some("abc")),
            vec![pair("title", "hello"), pair("csrfmiddlewaretoken", "abc")]
        );
    }

    #[test]
    fn no_token_leaves_form_alone() {
        let fields = vec![pair("title", "hello")];

        assert_eq!(form_fields(&fields, "csrfmiddlewaretoken", None), fields);
    }

    #[test]
    fn explicit_token_field_wins() {
        let fields = vec![pair("csrfmiddlewaretoken", "mine")];

        assert_eq!(
            form_fields(&fields, "csrfmiddlewaretoken", Some("abc")),
            fields
        );
    }
}
