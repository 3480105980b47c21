use async_trait::async_trait;
use serde_json::json;

use super::open_mailbox;
use crate::actions::{email_uid_param, mailbox_path_param, parse_single_uid};
use crate::error::HandlerError;
use crate::imap::error::ImapError;
use crate::imap::types::FetchQuery;
use crate::node::context::ExecutionContext;
use crate::node::item::ResultItem;
use crate::node::params::{OperationSchema, ParameterDescriptor};
use crate::node::registry::{Operation, OperationHandler};

pub struct DownloadEml;

#[async_trait]
impl OperationHandler for DownloadEml {
    fn operation(&self) -> Operation {
        Operation::DownloadEml
    }

    fn display_name(&self) -> &'static str {
        "Download as EML"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(mailbox_path_param())
            .parameter(email_uid_param())
            .parameter(
                ParameterDescriptor::string("outputBinaryField", "Put Output File in Field")
                    .default_value("data".into())
                    .required(),
            )
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let uid = parse_single_uid(&ctx.get_string("emailUid")?)?;
        let field = ctx.get_string("outputBinaryField")?;
        let path = open_mailbox(ctx, true).await?;

        let query = FetchQuery { source: true, ..Default::default() };
        let message = ctx
            .session()
            .fetch_one(uid, query)
            .await?
            .ok_or_else(|| ImapError::EmailNotFound(format!("UID {} in {}", uid, path)))?;
        let source = message
            .source
            .ok_or_else(|| ImapError::MissingData(format!("Message source for UID {}", uid)))?;

        let size = source.len();
        let binary = ctx.sink().prepare(source, &format!("{}.eml", uid), "message/rfc822")?;
        Ok(vec![ResultItem::new(json!({ "uid": uid, "mailboxPath": path, "size": size }))
            .with_binary(field, binary)])
    }
}
