pub mod attachment;
pub mod download;
pub mod draft;
pub mod flags;
pub mod list;
pub mod transfer;

use crate::error::HandlerError;
use crate::mime::decoder::{decode_charset, decode_transfer_encoding};
use crate::mime::PartDescriptor;
use crate::node::context::ExecutionContext;

/// Resolves `mailboxPath` and opens it on the session.
async fn open_mailbox(ctx: &ExecutionContext<'_>, read_only: bool) -> Result<String, HandlerError> {
    let path = ctx.get_string("mailboxPath")?;
    ctx.session().mailbox_open(&path, read_only).await?;
    Ok(path)
}

/// Downloads one text part and renders it using its declared charset.
async fn fetch_text_part(ctx: &ExecutionContext<'_>, uid: u32, part: &PartDescriptor) -> Result<String, HandlerError> {
    let raw = ctx.session().download(uid, &part.part_id).await?;
    let decoded = decode_transfer_encoding(&raw, part.encoding.as_deref());
    Ok(decode_charset(&decoded, part.charset.as_deref()))
}
