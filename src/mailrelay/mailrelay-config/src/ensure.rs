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
use crate::Config;

impl Config {
    /// Reject the values deserialization alone cannot catch.
    ///
    /// # Errors
    ///
    /// * `server.mail_domain` is empty
    /// * a timeout, the message size limit or the pool size is zero
    /// * only one of `cloud.inbound_path` and `cloud.inbound_key` is set
    pub fn ensure(mut config: Self) -> anyhow::Result<Self> {
        config.server.mail_domain = config.server.mail_domain.trim().to_string();
        anyhow::ensure!(
            !config.server.mail_domain.is_empty(),
            "server.mail_domain cannot be empty"
        );

        anyhow::ensure!(
            config.server.smtp.message_size_limit != 0,
            "server.smtp.message_size_limit cannot be set to 0"
        );
        anyhow::ensure!(
            config.store.connections != 0,
            "store.connections cannot be set to 0"
        );

        let mut timeouts = vec![
            ("server.smtp.command_timeout", config.server.smtp.command_timeout),
            ("server.smtp.data_timeout", config.server.smtp.data_timeout),
            ("inbound.lda_timeout", config.inbound.lda_timeout),
            ("store.timeout", config.store.timeout),
        ];

        if let Some(cloud) = config.cloud.as_mut() {
            timeouts.extend([
                ("cloud.timeout", cloud.timeout),
                ("cloud.recycle_interval", cloud.recycle_interval),
            ]);

            if let Some(path) = cloud.inbound_path.as_mut() {
                *path = path.trim_matches('/').to_string();
                anyhow::ensure!(!path.is_empty(), "cloud.inbound_path cannot be empty");
            }
            anyhow::ensure!(
                cloud.inbound_path.is_some() == cloud.inbound_key.is_some(),
                "cloud.inbound_path and cloud.inbound_key must be set together"
            );
        }

        for (name, value) in timeouts {
            anyhow::ensure!(!value.is_zero(), "{name} cannot be set to 0");
        }

        Ok(config)
    }
}
