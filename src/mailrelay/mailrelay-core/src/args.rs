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

/// Command line of the relay.
#[derive(Debug, PartialEq, Eq, clap::Parser)]
#[command(about, author, version)]
pub struct Args {
    /// Path of the configuration file (toml format)
    #[arg(short, long, default_value = "/etc/mailrelay/mailrelay.toml")]
    pub config: std::path::PathBuf,

    /// Also write the logs on the standard output.
    #[arg(long)]
    pub stdout: bool,

    ///
    #[command(subcommand)]
    pub command: Commands,
}

///
#[derive(Debug, PartialEq, Eq, clap::Subcommand)]
pub enum Commands {
    /// Start the SMTP listener and the HTTP server.
    Serve {
        /// Deliver the live mails now and periodically.
        #[arg(long)]
        recycle: bool,
    },
    /// Read a mail on the standard input and send it through the HTTP `/send/raw` endpoint.
    Sendmail,
    /// Work with the mails waiting in the cloud storage.
    Live {
        ///
        #[command(subcommand)]
        command: LiveCommand,
    },
    /// Print the loaded configuration as JSON, secrets hidden.
    ConfigShow,
}

///
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::Subcommand)]
pub enum LiveCommand {
    /// Print the keys of the live mails.
    List,
    /// Deliver every live mail.
    Recycle,
}
