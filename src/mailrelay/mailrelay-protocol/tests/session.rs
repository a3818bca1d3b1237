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
use mailrelay_protocol::{MessageHandler, ServerName, Session, SessionConfig};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

#[derive(Default)]
struct Recorder {
    messages: tokio::sync::Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl MessageHandler for Recorder {
    async fn on_message(&self, raw: String) -> anyhow::Result<String> {
        let failing = raw.contains("Subject: fail");
        self.messages.lock().await.push(raw);
        if failing {
            anyhow::bail!("delivery failed")
        }
        Ok("OK Message accepted for delivery".to_owned())
    }
}

fn config() -> SessionConfig {
    SessionConfig {
        server_name: ServerName::new("127.0.0.1", 2346),
        command_timeout: std::time::Duration::from_secs(5),
        data_timeout: std::time::Duration::from_secs(5),
        message_size_limit: 1024,
    }
}

/// Send `input` at once, return every reply line.
async fn run(input: &str, config: SessionConfig) -> (Vec<String>, Vec<String>) {
    let (client, server) = tokio::io::duplex(8192);
    let (server_read, server_write) = tokio::io::split(server);
    let recorder = std::sync::Arc::new(Recorder::default());

    let session = {
        let recorder = recorder.clone();
        tokio::spawn(async move {
            Session::new(server_read, server_write, config)
                .run(recorder.as_ref())
                .await
        })
    };

    let (client_read, mut client_write) = tokio::io::split(client);
    client_write.write_all(input.as_bytes()).await.unwrap();

    let mut replies = vec![];
    let mut lines = tokio::io::BufReader::new(client_read).lines();
    while let Some(line) = lines.next_line().await.unwrap() {
        replies.push(line);
    }

    let _ = session.await.unwrap();
    let messages = recorder.messages.lock().await.clone();
    (replies, messages)
}

#[test_log::test(tokio::test)]
async fn one_message() {
    let (replies, messages) = run(
        "EHLO test\r\nMAIL FROM:<a@x.com>\r\nRCPT TO:<b@x.com>\r\nDATA\r\nSubject: hi\r\n\r\nhello\r\n..dot\r\n.\r\nQUIT\r\n",
        config(),
    )
    .await;

    assert_eq!(
        replies,
        vec![
            "220 [127.0.0.1]:2346 SMTP Ready",
            "250 [127.0.0.1]:2346",
            "250 2.1.0 Sender OK",
            "250 2.1.5 Recipient OK",
            "354 Start mail input; end with <CRLF>.<CRLF>",
            "250 2.6.0 OK Message accepted for delivery",
            "211 2.0.0 [127.0.0.1]:2346 closing connection",
        ]
    );
    assert_eq!(messages, vec!["Subject: hi\r\n\r\nhello\r\n.dot\r\n"]);
}

#[test_log::test(tokio::test)]
async fn two_messages_after_a_failure() {
    let (replies, messages) = run(
        "helo test\r\ndata\r\nSubject: fail\r\n\r\n.\r\nDATA\r\nSubject: ok\r\n\r\n.\r\nquit\r\n",
        config(),
    )
    .await;

    assert_eq!(
        replies[2..].to_vec(),
        vec![
            "354 Start mail input; end with <CRLF>.<CRLF>",
            "554 5.3.0 Error: check server log",
            "354 Start mail input; end with <CRLF>.<CRLF>",
            "250 2.6.0 OK Message accepted for delivery",
            "211 2.0.0 [127.0.0.1]:2346 closing connection",
        ]
    );
    assert_eq!(messages.len(), 2);
}

#[test_log::test(tokio::test)]
async fn unrecognized_command_closes() {
    let (replies, messages) = run("EHLO test\r\nNOOP\r\nQUIT\r\n", config()).await;

    assert_eq!(
        replies,
        vec![
            "220 [127.0.0.1]:2346 SMTP Ready",
            "250 [127.0.0.1]:2346",
            "500 5.5.1 Error: command not recognized",
        ]
    );
    assert!(messages.is_empty());
}

#[test_log::test(tokio::test)]
async fn message_too_big() {
    let body = "a".repeat(2048);
    let (replies, messages) = run(
        &format!("EHLO test\r\nDATA\r\n{body}\r\n.\r\n"),
        config(),
    )
    .await;

    assert_eq!(
        replies.last().map(String::as_str),
        Some("552 5.3.4 Error: message size exceeds fixed maximum message size")
    );
    assert!(messages.is_empty());
}

#[test_log::test(tokio::test)]
async fn idle_client() {
    let config = SessionConfig {
        command_timeout: std::time::Duration::from_millis(100),
        ..config()
    };

    let (client, server) = tokio::io::duplex(1024);
    let (server_read, server_write) = tokio::io::split(server);

    let result = Session::new(server_read, server_write, config)
        .run(&Recorder::default())
        .await;
    assert!(matches!(result, Err(mailrelay_protocol::Error::Timeout { .. })));

    let mut replies = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut tokio::io::BufReader::new(client), &mut replies)
        .await
        .unwrap();
    assert_eq!(
        replies,
        "220 [127.0.0.1]:2346 SMTP Ready\r\n421 4.4.2 [127.0.0.1]:2346 Error: timeout exceeded\r\n"
    );
}
