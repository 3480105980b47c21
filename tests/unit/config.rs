// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests {
    use rustymail_actions::config::{Settings, SettingsError, StartTlsPolicy};
    use serial_test::serial;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_VARS: [&str; 8] = [
        "IMAP_HOST",
        "IMAP_PORT",
        "IMAP_USER",
        "IMAP_PASS",
        "IMAP_TLS",
        "IMAP_ALLOW_UNAUTHORIZED_CERTS",
        "RUSTYMAIL_IMAP__HOST",
        "RUSTYMAIL_LOG__LEVEL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    // Helper to write a temporary TOML settings file
    fn settings_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const FILE_CONTENT: &str = r#"
[imap]
host = "imap.example.com"
port = 143
user = "alice"
password = "secret"
tls = false
start_tls_policy = "optional"

[log]
level = "debug"
"#;

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        clear_env();
        let settings = Settings::new(None).expect("Failed to load default settings");

        assert_eq!(settings.imap.host, "localhost");
        assert_eq!(settings.imap.port, 993);
        assert!(settings.imap.tls);
        assert!(!settings.imap.allow_unauthorized_certs);
        assert_eq!(settings.imap.start_tls_policy, StartTlsPolicy::Disabled);
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    #[serial]
    fn test_load_file() {
        clear_env();
        let file = settings_file(FILE_CONTENT);
        let settings = Settings::new(file.path().to_str()).expect("Failed to load settings file");

        assert_eq!(settings.imap.host, "imap.example.com");
        assert_eq!(settings.imap.port, 143);
        assert_eq!(settings.imap.user, "alice");
        assert_eq!(settings.imap.password, "secret");
        assert!(!settings.imap.tls);
        assert_eq!(settings.imap.start_tls_policy, StartTlsPolicy::Optional);
        assert_eq!(settings.log.level, "debug");
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        clear_env();
        let file = settings_file(FILE_CONTENT);
        env::set_var("RUSTYMAIL_LOG__LEVEL", "warn");
        env::set_var("IMAP_HOST", "mail.internal");
        env::set_var("IMAP_PORT", "1143");
        env::set_var("IMAP_ALLOW_UNAUTHORIZED_CERTS", "true");

        let settings = Settings::new(file.path().to_str()).expect("Failed to load settings");
        clear_env();

        assert_eq!(settings.imap.host, "mail.internal");
        assert_eq!(settings.imap.port, 1143);
        assert!(settings.imap.allow_unauthorized_certs);
        assert_eq!(settings.imap.user, "alice");
        assert_eq!(settings.log.level, "warn");
    }

    #[test]
    #[serial]
    fn test_prefixed_variable_uses_double_underscore() {
        clear_env();
        let file = settings_file(FILE_CONTENT);
        env::set_var("RUSTYMAIL_IMAP__HOST", "prefixed.example.com");

        let settings = Settings::new(file.path().to_str()).expect("Failed to load settings");
        clear_env();

        assert_eq!(settings.imap.host, "prefixed.example.com");
        assert_eq!(settings.imap.port, 143);
    }

    #[test]
    #[serial]
    fn test_invalid_override_is_ignored() {
        clear_env();
        env::set_var("IMAP_PORT", "not-a-port");

        let settings = Settings::new(None).expect("Failed to load settings");
        clear_env();

        assert_eq!(settings.imap.port, 993);
    }

    #[test]
    #[serial]
    fn test_empty_host_is_rejected() {
        clear_env();
        env::set_var("IMAP_HOST", " ");

        let result = Settings::new(None);
        clear_env();

        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }
}
