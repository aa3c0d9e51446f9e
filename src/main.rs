mod api;
mod auth_cookie;
mod commands;
mod cookie;
mod data;
mod editor_config;
mod options;

use std::{env, panic, process};

use backtrace::Backtrace;
use structopt::StructOpt;

use crate::options::{Options, Subcommand};

fn run(options: Options) -> anyhow::Result<()> {
    match options.command {
        Subcommand::ReadCookie(read_options) => {
            commands::read_cookie(options.global, read_options)?
        }
        Subcommand::EditorConfig(editor_options) => {
            commands::editor_config(options.global, editor_options)?
        }
        Subcommand::UploadAttachment(upload_options) => {
            commands::upload_attachment(options.global, upload_options)?
        }
        Subcommand::PostForm(post_options) => commands::post_form(options.global, post_options)?,
    }

    Ok(())
}

fn main() {
    panic::set_hook(Box::new(|panic_info| {
        // PanicInfo's payload is usually a &'static str or String.
        // See: https://doc.rust-lang.org/beta/std/panic/struct.PanicInfo.html#method.payload
        let message = match panic_info.payload().downcast_ref::<&str>() {
            Some(message) => message.to_string(),
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(message) => message.clone(),
                None => "<no message>".to_string(),
            },
        };

        log::error!("csrfjar crashed! This is a bug.");
        log::error!("");
        log::error!("Details: {}", message);

        if let Some(location) = panic_info.location() {
            log::error!("in file {} on line {}", location.file(), location.line());
        }

        // When using the backtrace crate, we need to check the RUST_BACKTRACE
        // environment variable ourselves. Once we switch to the (currently
        // unstable) std::backtrace module, we won't need to do this anymore.
        let should_backtrace = env::var("RUST_BACKTRACE")
            .map(|var| var == "1")
            .unwrap_or(false);

        if should_backtrace {
            eprintln!("{:?}", Backtrace::new());
        } else {
            eprintln!(
                "note: run with `RUST_BACKTRACE=1` environment variable to display a backtrace."
            );
        }

        process::exit(1);
    }));

    let options = Options::from_args();

    let log_filter = match options.global.verbosity {
        0 => "info",
        1 => "info,csrfjar=debug",
        2 => "info,csrfjar=trace",
        _ => "trace",
    };

    let log_env = env_logger::Env::default().default_filter_or(log_filter);

    env_logger::Builder::from_env(log_env)
        .format_module_path(false)
        .format_timestamp(None)
        // Indent following lines equal to the log level label, like `[ERROR] `
        .format_indent(Some(8))
        .init();

    if let Err(err) = run(options) {
        log::error!("{:?}", err);
        process::exit(1);
    }
}
