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
use mailrelay_common::{MemoryStore, MessageIdStore, OutcomeKind, WHOLE_MESSAGE};
use mailrelay_delivery::{
    hook::{AliasRecipient, FallbackRecipient, MessageIdRewrite, MessageIdSave, RecipientFromHeaders},
    transport::{
        cloud::{Cloud, CloudMailClient},
        Lda,
    },
    Deliverer, DeliveryError,
};
use pretty_assertions::assert_eq;

#[cfg(unix)]
fn agent(dir: &std::path::Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("lda");
    std::fs::write(
        &path,
        format!(
            "#!/bin/sh\ncat > \"{}/$2.mail\"\ncase \"$2\" in unknown@*) exit 67 ;; esac\nexit 0\n",
            dir.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn inbound(dir: &std::path::Path) -> Deliverer {
    std::fs::write(dir.join("aliases.csv"), "real@x.com,alias@x.com\n").unwrap();

    Deliverer::builder(
        "lda",
        Lda::new(agent(dir), None, std::time::Duration::from_secs(5)),
    )
    .pre_hook(RecipientFromHeaders::new("x.com"))
    .pre_hook(FallbackRecipient::new(["postmaster@x.com".to_owned()]))
    .pre_hook(AliasRecipient::new(dir.join("aliases.csv")))
    .serialized(true)
    .build()
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn inbound_headers_then_alias() {
    let dir = tempfile::tempdir().unwrap();

    let result = inbound(dir.path())
        .deliver_raw("To: alias@x.com, b@y.com\n\nhello\n")
        .await
        .unwrap();

    assert_eq!(
        result.recipients.keys().collect::<Vec<_>>(),
        vec!["real@x.com"]
    );
    assert!(dir.path().join("real@x.com.mail").exists());
    assert!(!dir.path().join("b@y.com.mail").exists());
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn inbound_fallback() {
    let dir = tempfile::tempdir().unwrap();

    let result = inbound(dir.path())
        .deliver_raw("To: b@y.com\n\nhello\n")
        .await
        .unwrap();

    assert_eq!(
        result.recipients.keys().collect::<Vec<_>>(),
        vec!["postmaster@x.com"]
    );
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn inbound_partial_failure() {
    let dir = tempfile::tempdir().unwrap();

    let error = inbound(dir.path())
        .deliver(
            mailrelay_mail_parser::Mail::new("To: b@y.com\n\nhello\n"),
            Some(vec!["a@x.com".to_owned(), "unknown@x.com".to_owned()]),
        )
        .await
        .unwrap_err();

    let DeliveryError::Failed { result } = &error else {
        panic!("unexpected error: {error}");
    };
    assert_eq!(result.recipients["a@x.com"].kind, OutcomeKind::Success);
    assert_eq!(result.recipients["unknown@x.com"].kind, OutcomeKind::Failure);
}

#[cfg(unix)]
#[test_log::test(tokio::test)]
async fn inbound_unparseable_mail() {
    let dir = tempfile::tempdir().unwrap();

    let error = inbound(dir.path())
        .deliver_raw("To: a@x.com")
        .await
        .unwrap_err();

    assert!(matches!(error, DeliveryError::Parse(_)));
    assert!(!dir.path().join("a@x.com.mail").exists());
}

struct Provider {
    sent: Sent,
}

#[async_trait::async_trait]
impl CloudMailClient for Provider {
    async fn send_raw(&self, raw: Vec<u8>) -> anyhow::Result<Option<String>> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(String::from_utf8(raw)?);
        Ok(Some(format!("provider-{}", sent.len())))
    }
}

type Sent = std::sync::Arc<std::sync::Mutex<Vec<String>>>;

fn outbound(store: &std::sync::Arc<MemoryStore>, sent: &Sent) -> Deliverer {
    Deliverer::builder(
        "cloud",
        Cloud::new(
            Provider { sent: sent.clone() },
            "eu-west-1",
            "amazonses.com",
            std::time::Duration::from_secs(5),
        ),
    )
    .pre_hook(MessageIdRewrite::new(store.clone()))
    .post_hook(MessageIdSave::new(store.clone()))
    .serialized(true)
    .build()
}

#[test_log::test(tokio::test)]
async fn outbound_header_only_mail_is_not_sent() {
    let store = std::sync::Arc::new(MemoryStore::default());
    let sent = Sent::default();

    let error = outbound(&store, &sent)
        .deliver_raw("Message-ID: <orig@x.com>\r\nFrom: me@x.com\r\nTo: b@y.com\r\nSubject: hi\r\n")
        .await
        .unwrap_err();

    assert!(matches!(error, DeliveryError::Parse(_)));
    assert!(sent.lock().unwrap().is_empty());
    assert!(store.pairs().await.is_empty());
}

#[test_log::test(tokio::test)]
async fn outbound_thread() {
    let store = std::sync::Arc::new(MemoryStore::default());
    let sent = Sent::default();
    let outbound = outbound(&store, &sent);

    let first = outbound
        .deliver_raw("Message-ID: <first@x.com>\nTo: a@y.com\n\nhello\n")
        .await
        .unwrap();
    assert_eq!(
        first.provider_message_id.as_deref(),
        Some("provider-1@eu-west-1.amazonses.com")
    );
    assert_eq!(first.recipients[WHOLE_MESSAGE].kind, OutcomeKind::Success);
    assert_eq!(
        store.translated("first@x.com").await.unwrap().as_deref(),
        Some("provider-1@eu-west-1.amazonses.com")
    );

    outbound
        .deliver_raw("Message-ID: <second@x.com>\nIn-Reply-To: <first@x.com>\nTo: a@y.com\n\n> first@x.com wrote\n")
        .await
        .unwrap();

    assert_eq!(
        sent.lock().unwrap()[1],
        "Message-ID: <second@x.com>\nIn-Reply-To: <provider-1@eu-west-1.amazonses.com>\nTo: a@y.com\n\n> provider-1@eu-west-1.amazonses.com wrote\n"
    );
    assert_eq!(store.pairs().await.len(), 2);
}
