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

/// This structure contains all the field to configure the relay at the startup.
///
/// This structure will be loaded from a configuration file `-c, --config`
/// argument of the program. See [`crate::Config::from_toml`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Version requirement of the relay to parse this configuration file.
    pub version_requirement: semver::VersionReq,
    /// see [`field::FieldServer`]
    pub server: field::FieldServer,
    /// see [`field::FieldInbound`]
    #[serde(default)]
    pub inbound: field::FieldInbound,
    /// see [`field::FieldCloud`]
    ///
    /// Without this section, the outbound delivery and the live mail storage are disabled.
    #[serde(default)]
    pub cloud: Option<field::FieldCloud>,
    /// see [`field::FieldStore`]
    #[serde(default)]
    pub store: field::FieldStore,
}

/// The inner field of the relay's configuration.
#[allow(clippy::module_name_repetitions)]
pub mod field {
    /// The field related to the running service.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServer {
        /// Domain of the mails handled by the relay.
        ///
        /// Used to filter the recipients of the inbound mails.
        pub mail_domain: String,
        /// Root of the relay's data (logs of the agent, aliases, database).
        #[serde(default = "FieldServer::default_data_dir")]
        pub data_dir: std::path::PathBuf,
        /// see [`FieldServerInterfaces`]
        #[serde(default)]
        pub interfaces: FieldServerInterfaces,
        /// see [`FieldServerLogs`]
        #[serde(default)]
        pub logs: FieldServerLogs,
        /// see [`FieldServerSMTP`]
        #[serde(default)]
        pub smtp: FieldServerSMTP,
    }

    /// Addresses served by the relay.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerInterfaces {
        /// Address of the SMTP listener.
        #[serde(default = "FieldServerInterfaces::default_smtp")]
        pub smtp: std::net::SocketAddr,
        /// Address of the HTTP endpoints.
        #[serde(default = "FieldServerInterfaces::default_http")]
        pub http: std::net::SocketAddr,
    }

    /// The field related to the logs.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerLogs {
        /// Directory of the server's log.
        ///
        /// A daily rolling file will be created at `{filepath}/mailrelay.{YYYY-MM-DD}`.
        #[serde(default = "FieldServerLogs::default_filepath")]
        pub filepath: std::path::PathBuf,
        /// Customize the log level of the different part of the program.
        ///
        /// See <https://docs.rs/tracing-subscriber/0.3.15/tracing_subscriber/filter/struct.EnvFilter.html>
        #[serde(
            default = "FieldServerLogs::default_level",
            serialize_with = "crate::parser::tracing_directive::serialize",
            deserialize_with = "crate::parser::tracing_directive::deserialize"
        )]
        pub level: Vec<tracing_subscriber::filter::Directive>,
    }

    /// Configuration of the SMTP listener.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldServerSMTP {
        /// Maximum size in bytes of a message.
        #[serde(default = "FieldServerSMTP::default_message_size_limit")]
        pub message_size_limit: usize,
        /// Maximum wait for a command line.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerSMTP::default_command_timeout")]
        pub command_timeout: std::time::Duration,
        /// Maximum wait for a line of the message content.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldServerSMTP::default_data_timeout")]
        pub data_timeout: std::time::Duration,
    }

    /// Configuration of the delivery to the local mailboxes.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldInbound {
        /// Executable of the local delivery agent.
        #[serde(default = "FieldInbound::default_lda_path")]
        pub lda_path: std::path::PathBuf,
        /// Maximum run time of one agent invocation.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldInbound::default_lda_timeout")]
        pub lda_timeout: std::time::Duration,
        /// Directory of the agent's output, `{data_dir}/log` if missing.
        #[serde(default)]
        pub lda_logs: Option<std::path::PathBuf>,
        /// Recipients used when a mail has none.
        #[serde(default)]
        pub fallback: Vec<String>,
        /// CSV file of `real,alias` rows, `{data_dir}/aliases.csv` if missing.
        #[serde(default)]
        pub alias_file: Option<std::path::PathBuf>,
        /// Executable of the mailbox administration tool.
        #[serde(default = "FieldInbound::default_doveadm_path")]
        pub doveadm_path: std::path::PathBuf,
        /// Save a copy of each outbound mail in the sender's `Sent` mailbox.
        #[serde(default = "FieldInbound::default_save_sent")]
        pub save_sent: bool,
    }

    /// Configuration of the cloud provider, used to send mails and to store the received ones.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldCloud {
        /// Region of the provider's endpoints.
        pub region: String,
        ///
        pub access_key_id: String,
        ///
        pub secret_access_key: String,
        /// Domain appended to the provider's message ids.
        #[serde(default = "FieldCloud::default_provider_domain")]
        pub provider_domain: String,
        /// Maximum wait for one call to the provider.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldCloud::default_timeout")]
        pub timeout: std::time::Duration,
        /// Bucket where the provider drops the received mails.
        pub mail_bucket: String,
        /// Path of the HTTP endpoint called by the provider's notifications.
        #[serde(default)]
        pub inbound_path: Option<String>,
        /// Expected `Authorization` header of the notifications.
        #[serde(default)]
        pub inbound_key: Option<String>,
        /// Period of the consumption of the mails left in the bucket.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldCloud::default_recycle_interval")]
        pub recycle_interval: std::time::Duration,
    }

    /// Configuration of the message id database.
    #[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
    #[serde(deny_unknown_fields)]
    pub struct FieldStore {
        /// Sqlite database, `{data_dir}/db.sqlite` if missing.
        #[serde(default)]
        pub path: Option<std::path::PathBuf>,
        /// Size of the connection pool.
        #[serde(default = "FieldStore::default_connections")]
        pub connections: u32,
        /// Maximum wait for a connection of the pool.
        #[serde(with = "humantime_serde")]
        #[serde(default = "FieldStore::default_timeout")]
        pub timeout: std::time::Duration,
    }
}
