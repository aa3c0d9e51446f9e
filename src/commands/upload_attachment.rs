use std::borrow::Cow;

use anyhow::Context;
use fs_err as fs;

use crate::{
    api::AttachmentUploadData,
    options::{GlobalOptions, UploadAttachmentOptions},
};

use super::{connect, load_config};

pub fn upload_attachment(
    global: GlobalOptions,
    options: UploadAttachmentOptions,
) -> anyhow::Result<()> {
    let config = load_config(&global)?;

    let contents = fs::read(&options.path)?;
    let file_name = options
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", options.path.display()))?;

    let url = config.resolve_url(options.url.as_deref().unwrap_or(&config.upload.url));

    let upload_data = AttachmentUploadData {
        contents: Cow::Owned(contents),
        file_name,
        entity_index: options
            .entity_index
            .as_deref()
            .unwrap_or(&config.upload.entity_index),
        entity_uuid: options
            .entity_uuid
            .as_deref()
            .unwrap_or(&config.upload.entity_uuid),
    };

    let mut client = connect(global, &config, options.require_token)?;

    log::info!("Uploading {} to {}", options.path.display(), url);
    let response = client.upload_attachment(&url, &upload_data)?;

    eprintln!("Attachment uploaded successfully!");
    if let Some(stored_name) = &response.file_name {
        log::debug!("Server stored the file as {}", stored_name);
    }

    println!("{}", response.url);

    Ok(())
}
