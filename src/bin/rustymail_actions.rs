// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Runs one operation over a batch of items and prints the result items.
//!
//! Usage:
//!   rustymail-actions --resource mailbox --operation loadMailboxList
//!   rustymail-actions --resource email --operation getEmailsList \
//!       --parameters '{"mailboxPath": "INBOX", "limit": 10}'
//!   rustymail-actions --resource email --operation setEmailFlags --items items.json
//!
//! Exit codes:
//!   0 - Success
//!   1 - The invocation failed

use std::io::Read;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use serde_json::{Map, Value};

use rustymail_actions::config::Settings;
use rustymail_actions::error::{ComposedError, NodeError};
use rustymail_actions::imap::client::ImapConnector;
use rustymail_actions::node::{ExecutionLoop, InputItem, Invocation};

#[derive(Parser, Debug)]
#[command(name = "rustymail-actions", version, about = "Run an IMAP mailbox or email operation")]
struct Cli {
    /// Path to a TOML settings file
    #[arg(long, env = "RUSTYMAIL_CONFIG")]
    config: Option<String>,

    /// Resource to operate on (mailbox or email)
    #[arg(long)]
    resource: String,

    /// Operation of the resource, e.g. getEmailsList
    #[arg(long)]
    operation: String,

    /// Operation parameters as a JSON object
    #[arg(long, default_value = "{}")]
    parameters: String,

    /// JSON array of input items; `-` reads stdin. Defaults to one empty item.
    #[arg(long)]
    items: Option<String>,

    /// Emit an error item for a failing input item instead of aborting
    #[arg(long)]
    continue_on_fail: bool,
}

fn read_items(source: Option<&str>) -> Result<Vec<InputItem>, String> {
    let raw = match source {
        None => return Ok(vec![InputItem::default()]),
        Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read items from stdin: {}", e))?;
            buf
        }
        Some(path) => std::fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path, e))?,
    };
    serde_json::from_str(&raw).map_err(|e| format!("Items must be a JSON array of items: {}", e))
}

fn parse_parameters(raw: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Parameters must be a JSON object".to_string()),
        Err(e) => Err(format!("Invalid parameters JSON: {}", e)),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = Settings::new(cli.config.as_deref()).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {}", err);
        exit(1);
    });
    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log.level.as_str())).init();

    let invocation = match (parse_parameters(&cli.parameters), read_items(cli.items.as_deref())) {
        (Ok(parameters), Ok(items)) => Invocation {
            resource: cli.resource,
            operation: cli.operation,
            parameters,
            continue_on_fail: cli.continue_on_fail,
            items,
        },
        (Err(e), _) | (_, Err(e)) => {
            error!("{}", e);
            exit(1);
        }
    };

    let connector = Arc::new(ImapConnector::new(settings.imap));
    match ExecutionLoop::new(connector).run(invocation).await {
        Ok(results) => {
            info!("Produced {} item(s)", results.len());
            match serde_json::to_string_pretty(&results) {
                Ok(out) => println!("{}", out),
                Err(e) => {
                    error!("Failed to serialize results: {}", e);
                    exit(1);
                }
            }
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            if let NodeError::Item(ComposedError { description: Some(details), .. }) = &e {
                eprintln!("{}", details);
            }
            exit(1);
        }
    }
}
