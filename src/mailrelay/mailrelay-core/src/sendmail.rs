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
use anyhow::Context;

#[derive(Debug, serde::Deserialize)]
struct Sent {
    #[serde(rename = "providerMessageId")]
    provider_message_id: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct Refused {
    msg: String,
}

/// Post `raw` to the `/send/raw` endpoint of the HTTP server at `addr`, and
/// return the id the provider gave to the mail.
///
/// # Errors
///
/// * the server cannot be reached
/// * the server answered with a non-success status, its message is part of the error
/// * the answer is not the expected json
pub async fn send_raw(addr: std::net::SocketAddr, raw: String) -> anyhow::Result<Option<String>> {
    let host = if addr.ip().is_unspecified() {
        std::net::IpAddr::from(std::net::Ipv4Addr::LOCALHOST)
    } else {
        addr.ip()
    };
    let url = format!("http://{}/send/raw", std::net::SocketAddr::new(host, addr.port()));

    let response = reqwest::Client::new()
        .post(&url)
        .body(raw)
        .send()
        .await
        .with_context(|| format!("cannot reach {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let msg = serde_json::from_str::<Refused>(&body).map_or(body, |r| r.msg);
        anyhow::bail!("{url} answered {status}: {msg}");
    }

    let sent = response
        .json::<Sent>()
        .await
        .with_context(|| format!("invalid answer from {url}"))?;
    Ok(sent.provider_message_id)
}

/// Read a mail on the standard input and send it through the relay at `addr`.
///
/// # Errors
///
/// * the standard input cannot be read
/// * see [`send_raw`]
pub async fn sendmail(addr: std::net::SocketAddr) -> anyhow::Result<Option<String>> {
    let mut raw = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut tokio::io::stdin(), &mut raw)
        .await
        .context("cannot read the mail on the standard input")?;

    send_raw(addr, raw).await
}
