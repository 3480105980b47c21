use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::open_mailbox;
use crate::actions::{email_uid_param, mailbox_path_param, parse_uid_set};
use crate::error::HandlerError;
use crate::imap::types::Flag;
use crate::node::context::ExecutionContext;
use crate::node::item::ResultItem;
use crate::node::params::{OperationSchema, ParameterDescriptor};
use crate::node::registry::{Operation, OperationHandler};

const SETTABLE_FLAGS: [(&str, Flag); 5] = [
    ("Seen", Flag::Seen),
    ("Answered", Flag::Answered),
    ("Flagged", Flag::Flagged),
    ("Deleted", Flag::Deleted),
    ("Draft", Flag::Draft),
];

/// Splits `{Seen: true, Flagged: false}` into flags to add and to remove.
/// Keys that are absent or not booleans are left untouched.
fn partition_flags(requested: &Map<String, Value>) -> (Vec<Flag>, Vec<Flag>) {
    let mut add = Vec::new();
    let mut remove = Vec::new();
    for (name, flag) in SETTABLE_FLAGS.iter() {
        let value = match requested.get(*name) {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) => s.trim().parse::<bool>().ok(),
            _ => None,
        };
        match value {
            Some(true) => add.push(flag.clone()),
            Some(false) => remove.push(flag.clone()),
            None => {}
        }
    }
    (add, remove)
}

fn flag_names(flags: &[Flag]) -> Vec<String> {
    flags.iter().map(|f| f.to_string().trim_start_matches('\\').to_string()).collect()
}

pub struct SetEmailFlags;

#[async_trait]
impl OperationHandler for SetEmailFlags {
    fn operation(&self) -> Operation {
        Operation::SetEmailFlags
    }

    fn display_name(&self) -> &'static str {
        "Set Flags"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(mailbox_path_param())
            .parameter(email_uid_param())
            .parameter(ParameterDescriptor::collection(
                "flags",
                "Flags",
                SETTABLE_FLAGS
                    .iter()
                    .map(|(name, _)| ParameterDescriptor::boolean(name, name))
                    .collect(),
            ))
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let uids = parse_uid_set(&ctx.get_string("emailUid")?)?;
        let (add, remove) = partition_flags(&ctx.get_object("flags")?);
        open_mailbox(ctx, false).await?;

        let session = ctx.session();
        if !add.is_empty() {
            session.flags_add(&uids, &add).await?;
        }
        if !remove.is_empty() {
            session.flags_remove(&uids, &remove).await?;
        }

        Ok(vec![ResultItem::new(json!({
            "uid": uids.as_str(),
            "added": flag_names(&add),
            "removed": flag_names(&remove),
        }))])
    }
}
