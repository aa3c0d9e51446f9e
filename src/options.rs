use std::path::PathBuf;

use secrecy::SecretString;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Options {
    #[structopt(flatten)]
    pub global: GlobalOptions,

    #[structopt(subcommand)]
    pub command: Subcommand,
}

#[derive(Debug, StructOpt)]
pub struct GlobalOptions {
    /// The full cookie header to send, as a browser would, e.g.
    /// "sessionid=...; csrftoken=...". If it carries no token, one is fetched
    /// from the site.
    #[structopt(
        long,
        global = true,
        env = "CSRFJAR_COOKIE",
        hide_env_values = true
    )]
    pub cookie: Option<SecretString>,

    /// The folder containing csrfjar.toml. Defaults to the current directory.
    #[structopt(long, global = true, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Sets verbosity level. Can be specified multiple times.
    #[structopt(long = "verbose", short, global = true, parse(from_occurrences))]
    pub verbosity: u8,
}

#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Print the decoded value of a single cookie from the cookie header.
    ReadCookie(ReadCookieOptions),

    /// Print the editor initialization options, upload endpoint and token
    /// header included, as JSON.
    EditorConfig(EditorConfigOptions),

    /// Upload a file through the editor's attachment endpoint and print the
    /// URL it was stored at.
    UploadAttachment(UploadAttachmentOptions),

    /// Send an authenticated form post and log the response.
    PostForm(PostFormOptions),
}

#[derive(Debug, StructOpt)]
pub struct ReadCookieOptions {
    /// The name of the cookie to look up.
    pub name: String,
}

#[derive(Debug, StructOpt)]
pub struct EditorConfigOptions {
    /// Pretty-print the JSON output.
    #[structopt(long)]
    pub pretty: bool,
}

#[derive(Debug, StructOpt)]
pub struct UploadAttachmentOptions {
    /// The path to the file to upload.
    #[structopt(parse(from_os_str))]
    pub path: PathBuf,

    /// The upload endpoint. Overrides `upload.url` from csrfjar.toml.
    #[structopt(long)]
    pub url: Option<String>,

    /// Overrides `upload.entity_index` from csrfjar.toml.
    #[structopt(long)]
    pub entity_index: Option<String>,

    /// Overrides `upload.entity_uuid` from csrfjar.toml.
    #[structopt(long)]
    pub entity_uuid: Option<String>,

    /// Abort instead of uploading when no CSRF token can be found.
    #[structopt(long)]
    pub require_token: bool,
}

#[derive(Debug, StructOpt)]
pub struct PostFormOptions {
    /// The endpoint to post to. Overrides `post.url` from csrfjar.toml.
    #[structopt(long)]
    pub url: Option<String>,

    /// Extra form fields, given as KEY=VALUE. Can be specified multiple times.
    #[structopt(long = "field", parse(try_from_str = parse_key_value))]
    pub fields: Vec<(String, String)>,

    /// Abort instead of posting when no CSRF token can be found.
    #[structopt(long)]
    pub require_token: bool,
}

fn parse_key_value(input: &str) -> Result<(String, String), String> {
    match input.find('=') {
        Some(index) => Ok((input[..index].to_owned(), input[index + 1..].to_owned())),
        None => Err(format!("expected KEY=VALUE, got '{}'", input)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_value_pairs() {
        assert_eq!(
            parse_key_value("title=a=b"),
            Ok(("title".to_owned(), "a=b".to_owned()))
        );
        assert_eq!(parse_key_value("empty="), Ok(("empty".to_owned(), String::new())));
        assert!(parse_key_value("novalue").is_err());
    }

    #[test]
    fn post_form_arguments() {
        let options = Options::from_iter_safe(&[
            "csrfjar",
            "post-form",
            "--url",
            "http://localhost:8000/",
            "--field",
            "a=1",
            "--field",
            "b=2",
            "-vv",
        ])
        .unwrap();

        assert_eq!(options.global.verbosity, 2);

        match options.command {
            Subcommand::PostForm(post) => {
                assert_eq!(post.url.as_deref(), Some("http://localhost:8000/"));
                assert_eq!(
                    post.fields,
                    vec![
                        ("a".to_owned(), "1".to_owned()),
                        ("b".to_owned(), "2".to_owned())
                    ]
                );
                assert!(!post.require_token);
            }
            other => panic!("unexpected subcommand: {:?}", other),
        }
    }
}
