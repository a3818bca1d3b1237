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
//! Mail relay executable

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]

mod args;
mod sendmail;

pub use args::{Args, Commands, LiveCommand};
pub use sendmail::{send_raw, sendmail};

#[cfg(debug_assertions)]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_ansi(false)
    };
}

#[cfg(not(debug_assertions))]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(false)
            .with_target(false)
            .with_ansi(false)
    };
}

/// Initialize the tracing subsystem: a daily rolling file in
/// `server.logs.filepath`, and the standard output if requested.
///
/// # Errors
///
/// * the log directory cannot be created
/// * a global subscriber is already set
pub fn init_logs(args: &Args, config: &mailrelay_config::Config) -> anyhow::Result<()> {
    use anyhow::Context;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let directory = &config.server.logs.filepath;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("cannot create log directory {directory:?}"))?;

    let subscriber = tracing_subscriber::registry()
        .with({
            let mut e = tracing_subscriber::EnvFilter::default();
            for i in &config.server.logs.level {
                e = e.add_directive(i.clone());
            }
            e
        })
        .with(get_fmt!().with_writer(tracing_appender::rolling::daily(directory, "mailrelay")));

    if args.stdout {
        subscriber
            .with(get_fmt!().with_writer(std::io::stdout).with_ansi(true))
            .try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| anyhow::anyhow!("{e}"))
}
