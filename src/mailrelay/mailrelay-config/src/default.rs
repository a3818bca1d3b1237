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
use crate::config::field::{
    FieldCloud, FieldInbound, FieldServer, FieldServerInterfaces, FieldServerLogs,
    FieldServerSMTP, FieldStore,
};

impl FieldServer {
    pub(crate) fn default_data_dir() -> std::path::PathBuf {
        "/var/lib/mailrelay".into()
    }
}

impl Default for FieldServerInterfaces {
    fn default() -> Self {
        Self {
            smtp: Self::default_smtp(),
            http: Self::default_http(),
        }
    }
}

impl FieldServerInterfaces {
    pub(crate) fn default_smtp() -> std::net::SocketAddr {
        "127.0.0.1:2346".parse().expect("hardcoded value is valid")
    }

    pub(crate) fn default_http() -> std::net::SocketAddr {
        "0.0.0.0:2345".parse().expect("hardcoded value is valid")
    }
}

impl Default for FieldServerLogs {
    fn default() -> Self {
        Self {
            filepath: Self::default_filepath(),
            level: Self::default_level(),
        }
    }
}

impl FieldServerLogs {
    pub(crate) fn default_filepath() -> std::path::PathBuf {
        "/var/log/mailrelay/".into()
    }

    pub(crate) fn default_level() -> Vec<tracing_subscriber::filter::Directive> {
        vec!["info".parse().expect("hardcoded value is valid")]
    }
}

impl Default for FieldServerSMTP {
    fn default() -> Self {
        Self {
            message_size_limit: Self::default_message_size_limit(),
            command_timeout: Self::default_command_timeout(),
            data_timeout: Self::default_data_timeout(),
        }
    }
}

impl FieldServerSMTP {
    pub(crate) const fn default_message_size_limit() -> usize {
        20 * 1024 * 1024
    }

    pub(crate) const fn default_command_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    pub(crate) const fn default_data_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(5 * 60)
    }
}

impl Default for FieldInbound {
    fn default() -> Self {
        Self {
            lda_path: Self::default_lda_path(),
            lda_timeout: Self::default_lda_timeout(),
            lda_logs: None,
            fallback: vec![],
            alias_file: None,
            doveadm_path: Self::default_doveadm_path(),
            save_sent: Self::default_save_sent(),
        }
    }
}

impl FieldInbound {
    pub(crate) fn default_lda_path() -> std::path::PathBuf {
        "/dovecot/libexec/dovecot/dovecot-lda".into()
    }

    pub(crate) const fn default_lda_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }

    pub(crate) fn default_doveadm_path() -> std::path::PathBuf {
        "/dovecot/bin/doveadm".into()
    }

    pub(crate) const fn default_save_sent() -> bool {
        true
    }
}

impl FieldCloud {
    pub(crate) fn default_provider_domain() -> String {
        "amazonses.com".to_string()
    }

    pub(crate) const fn default_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    pub(crate) const fn default_recycle_interval() -> std::time::Duration {
        std::time::Duration::from_secs(6 * 60 * 60)
    }
}

impl Default for FieldStore {
    fn default() -> Self {
        Self {
            path: None,
            connections: Self::default_connections(),
            timeout: Self::default_timeout(),
        }
    }
}

impl FieldStore {
    pub(crate) const fn default_connections() -> u32 {
        4
    }

    pub(crate) const fn default_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }
}
