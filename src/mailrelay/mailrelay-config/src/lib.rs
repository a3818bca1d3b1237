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
//! Mail relay configuration
//!
//! The relay is configured by a [TOML] file given with the `-c, --config` flag.
//! Every field but `version_requirement` and `server.mail_domain` has a default
//! value.
//!
//! ```toml
//! version_requirement = ">=1.0.0"
//!
//! [server]
//! mail_domain = "example.com"
//!
//! [cloud]
//! region = "eu-west-1"
//! access_key_id = "AKIA..."
//! secret_access_key = "..."
//! mail_bucket = "example-mail"
//! ```
//!
//! [TOML]: https://github.com/toml-lang/toml

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
#![allow(clippy::use_self)] // false positive

mod parser {
    pub mod tracing_directive;
}

mod config;
mod default;
mod ensure;

pub use config::{field, Config};

/// Placeholder written instead of the secrets by [`Config::to_masked_json`].
pub const MASK: &str = "***";

impl Config {
    /// Parse a [`Config`] with [TOML] format
    ///
    /// # Errors
    ///
    /// * data is not a valid [TOML]
    /// * one field is unknown
    /// * the version requirement are not fulfilled
    /// * a mandatory field is not provided (no default value)
    /// * a value is rejected by the validation (see [`Config::ensure`])
    ///
    /// [TOML]: https://github.com/toml-lang/toml
    pub fn from_toml(input: &str) -> anyhow::Result<Self> {
        #[derive(serde::Deserialize)]
        struct VersionRequirement {
            version_requirement: semver::VersionReq,
        }

        let version_requirement = toml::from_str::<VersionRequirement>(input)?.version_requirement;
        let pkg_version = semver::Version::parse(env!("CARGO_PKG_VERSION"))?;

        if !version_requirement.matches(&pkg_version) {
            anyhow::bail!(
                "Version requirement not fulfilled: expected '{version_requirement}' but got '{pkg_version}'"
            );
        }

        toml::from_str::<Self>(input)
            .map(Self::ensure)
            .map_err(anyhow::Error::new)?
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// * the file cannot be read
    /// * see [`Config::from_toml`]
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let input = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file {path:?}"))?;
        Self::from_toml(&input).with_context(|| format!("invalid configuration file {path:?}"))
    }

    /// Render the configuration as pretty JSON, with every secret replaced by [`MASK`].
    ///
    /// # Errors
    ///
    /// * the serialization failed
    pub fn to_masked_json(&self) -> anyhow::Result<String> {
        let mut masked = self.clone();
        if let Some(cloud) = masked.cloud.as_mut() {
            cloud.secret_access_key = MASK.to_string();
            if cloud.inbound_key.is_some() {
                cloud.inbound_key = Some(MASK.to_string());
            }
        }
        Ok(serde_json::to_string_pretty(&masked)?)
    }

    /// Directory of the local delivery agent's logs.
    #[must_use]
    pub fn lda_logs(&self) -> std::path::PathBuf {
        self.inbound
            .lda_logs
            .clone()
            .unwrap_or_else(|| self.server.data_dir.join("log"))
    }

    /// Path of the alias file.
    #[must_use]
    pub fn alias_file(&self) -> std::path::PathBuf {
        self.inbound
            .alias_file
            .clone()
            .unwrap_or_else(|| self.server.data_dir.join("aliases.csv"))
    }

    /// Path of the message id database.
    #[must_use]
    pub fn store_path(&self) -> std::path::PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.server.data_dir.join("db.sqlite"))
    }
}

#[cfg(test)]
mod tests;
