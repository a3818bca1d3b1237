/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::{field::FieldCloud, Config, MASK};
use pretty_assertions::assert_eq;

const MINIMAL: &str = r#"
version_requirement = ">=1.0.0"

[server]
mail_domain = "example.com"
"#;

const FULL: &str = r#"
version_requirement = ">=1.0.0, <2.0.0"

[server]
mail_domain = " example.com "
data_dir = "/srv/relay"

[server.interfaces]
smtp = "127.0.0.1:25"
http = "[::]:8080"

[server.logs]
filepath = "/srv/relay/log"
level = ["warn", "mailrelay_delivery=debug"]

[server.smtp]
message_size_limit = 1024
command_timeout = "10s"
data_timeout = "1m"

[inbound]
lda_path = "/usr/lib/dovecot/dovecot-lda"
lda_timeout = "2m"
doveadm_path = "/usr/bin/doveadm"
save_sent = false
fallback = ["postmaster@example.com"]

[cloud]
region = "eu-west-3"
access_key_id = "AKIAEXAMPLE"
secret_access_key = "very-secret"
mail_bucket = "example-mail"
inbound_path = "/notify/"
inbound_key = "also-secret"
recycle_interval = "1h"

[store]
connections = 2
"#;

#[test]
fn minimal() {
    let config = Config::from_toml(MINIMAL).unwrap();

    assert_eq!(config.server.mail_domain, "example.com");
    assert_eq!(
        config.server.interfaces.smtp,
        "127.0.0.1:2346".parse().unwrap()
    );
    assert_eq!(config.server.smtp.message_size_limit, 20 * 1024 * 1024);
    assert_eq!(config.cloud, None);
    assert!(config.inbound.save_sent);
    assert_eq!(
        config.inbound.doveadm_path,
        std::path::PathBuf::from("/dovecot/bin/doveadm")
    );
    assert_eq!(
        config.lda_logs(),
        std::path::PathBuf::from("/var/lib/mailrelay/log")
    );
    assert_eq!(
        config.alias_file(),
        std::path::PathBuf::from("/var/lib/mailrelay/aliases.csv")
    );
    assert_eq!(
        config.store_path(),
        std::path::PathBuf::from("/var/lib/mailrelay/db.sqlite")
    );
}

#[test]
fn full() {
    let config = Config::from_toml(FULL).unwrap();

    assert_eq!(config.server.mail_domain, "example.com");
    assert_eq!(config.server.interfaces.http, "[::]:8080".parse().unwrap());
    assert_eq!(config.server.logs.level.len(), 2);
    assert_eq!(
        config.server.smtp.data_timeout,
        std::time::Duration::from_secs(60)
    );
    assert_eq!(config.inbound.fallback, vec!["postmaster@example.com"]);
    assert!(!config.inbound.save_sent);
    assert_eq!(
        config.lda_logs(),
        std::path::PathBuf::from("/srv/relay/log")
    );
    assert_eq!(config.store.connections, 2);

    let cloud = config.cloud.unwrap();
    assert_eq!(cloud.provider_domain, "amazonses.com");
    assert_eq!(cloud.inbound_path.as_deref(), Some("notify"));
    assert_eq!(
        cloud.timeout,
        FieldCloud::default_timeout()
    );
}

#[test]
fn masked_json() {
    let json = Config::from_toml(FULL).unwrap().to_masked_json().unwrap();

    assert!(!json.contains("very-secret"));
    assert!(!json.contains("also-secret"));
    assert!(json.contains(MASK));
    assert!(json.contains("AKIAEXAMPLE"));
}

#[rstest::rstest]
#[case::version(MINIMAL.replace(">=1.0.0", ">=2.0.0"))]
#[case::unknown_field(format!("{MINIMAL}foo = 1\n"))]
#[case::missing_domain(MINIMAL.replace("mail_domain = \"example.com\"", ""))]
#[case::empty_domain(MINIMAL.replace("\"example.com\"", "\"  \""))]
#[case::zero_timeout(format!("{MINIMAL}[server.smtp]\ncommand_timeout = \"0s\"\n"))]
#[case::zero_connections(format!("{MINIMAL}[store]\nconnections = 0\n"))]
#[case::path_without_key(FULL.replace("inbound_key = \"also-secret\"", ""))]
#[case::bad_directive(FULL.replace("\"warn\",", "\"a=notalevel\","))]
fn rejected(#[case] input: String) {
    assert!(Config::from_toml(&input).is_err());
}
