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
use mailrelay::{Args, Commands, LiveCommand};
use mailrelay_config::Config;
use mailrelay_server::Services;

fn main() {
    if let Err(err) = try_main() {
        let error = format!("mailrelay terminating error: '{err}'");

        eprintln!("{error}");
        tracing::error!(error);
        err.chain().skip(1).for_each(|cause| {
            let reason = format!("because: {cause}");

            eprintln!("{reason}");
            tracing::error!(reason);
        });
        std::process::exit(1);
    }
}

fn live_fetcher(config: &Config) -> anyhow::Result<mailrelay_server::Fetcher> {
    let cloud = config
        .cloud
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("the [cloud] section of the configuration is required"))?;

    Ok(mailrelay_server::live_fetcher(
        cloud,
        std::sync::Arc::new(mailrelay_server::inbound(config)),
    ))
}

fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("Loaded configuration: {}", config.to_masked_json()?);
    Ok(())
}

async fn run(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Serve { recycle } => {
            Services::new(std::sync::Arc::new(config))?
                .serve(recycle)
                .await
        }
        Commands::Sendmail => {
            let id = mailrelay::sendmail(config.server.interfaces.http).await?;
            println!("Provider message id: {}", id.as_deref().unwrap_or("none"));
            Ok(())
        }
        Commands::Live {
            command: LiveCommand::List,
        } => {
            let keys = live_fetcher(&config)?.list().await?;
            println!("Total {}:", keys.len());
            for key in keys {
                println!("{key}");
            }
            Ok(())
        }
        Commands::Live {
            command: LiveCommand::Recycle,
        } => {
            let delivered = live_fetcher(&config)?.recycle().await?;
            println!("{delivered} live mail(s) delivered.");
            Ok(())
        }
        Commands::ConfigShow => show_config(&config),
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();
    let config = Config::from_path(&args.config)?;

    if args.command == Commands::ConfigShow {
        return show_config(&config);
    }

    mailrelay::init_logs(&args, &config)?;
    tracing::info!(logs = ?config.server.logs.filepath, "mailrelay logs initialized.");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("mailrelay")
        .build()?
        .block_on(run(args.command, config))
}
