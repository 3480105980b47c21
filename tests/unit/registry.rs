use serde_json::json;

use rustymail_actions::node::{Operation, OperationRegistry, ParameterDescriptor, Resource};

fn property<'a>(properties: &'a [ParameterDescriptor], name: &str, operation: &str) -> Option<&'a ParameterDescriptor> {
    properties.iter().find(|p| {
        p.name == name
            && p.display_options
                .as_ref()
                .and_then(|d| d.show.get("operation"))
                .map(|ops| ops.iter().any(|o| o == operation))
                .unwrap_or(false)
    })
}

#[test]
fn test_resources_expose_their_operations() {
    let registry = OperationRegistry::global();
    let resources = registry.resources();
    assert_eq!(resources.len(), Resource::ALL.len());

    let total: usize = resources.iter().map(|r| r.operations.len()).sum();
    assert_eq!(total, Operation::ALL.len());
    for resource in resources {
        assert!(resource.operations.iter().all(|op| op.resource() == resource.resource));
    }
}

#[test]
fn test_resolve_by_name() {
    let registry = OperationRegistry::global();
    let descriptor = registry.resolve("email", "downloadAttachment").unwrap();
    assert_eq!(descriptor.key().operation, Operation::DownloadAttachment);
    assert!(descriptor.schema().get("partId").is_some());
    assert!(registry.resolve("email", "loadMailboxList").is_err());
    assert!(registry.resolve("calendar", "getStatus").is_err());
}

#[test]
fn test_node_properties_carry_display_options() {
    let properties = OperationRegistry::global().node_properties();
    assert_eq!(properties[0].name, "resource");

    let list_path = property(&properties, "mailboxPath", "getEmailsList").expect("mailboxPath for getEmailsList");
    assert_eq!(list_path.display_options.as_ref().unwrap().show["resource"], vec!["email".to_string()]);
    assert_eq!(list_path.default, json!("INBOX"));

    let status_path = property(&properties, "mailboxPath", "getStatus").expect("mailboxPath for getStatus");
    assert_eq!(status_path.display_options.as_ref().unwrap().show["resource"], vec!["mailbox".to_string()]);

    // Each operation gets its own copy of a shared parameter.
    assert!(property(&properties, "partId", "getEmailsList").is_none());
    assert!(property(&properties, "partId", "downloadAttachment").is_some());

    let rendered = serde_json::to_value(list_path).unwrap();
    assert_eq!(rendered["type"], "resourceLocator");
    assert_eq!(rendered["displayOptions"]["show"]["operation"], json!(["getEmailsList"]));
}
