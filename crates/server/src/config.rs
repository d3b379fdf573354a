use std::{collections::HashMap, net::SocketAddr, path::PathBuf};

use anyhow::{bail, Context};
use config::{Config, Environment, File};
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use shared::domain::{ApplicationId, ChannelId};
use url::Url;

use crate::signature::parse_public_key;

const SETTINGS_FILE: &str = "panel";
const ENV_PREFIX: &str = "APP";

/// Plain variables accepted for compatibility with older deployments. They
/// win over every other source.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord_token"),
    ("PM2_CHANNEL_ID", "channel_id"),
    ("DISCORD_APPLICATION_ID", "application_id"),
    ("DISCORD_PUBLIC_KEY", "public_key"),
    ("PM2_BIN", "pm2_bin"),
    ("SERVER_BIND", "server_bind"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub discord_token: String,
    pub application_id: String,
    /// Hex encoded Ed25519 key used to verify interaction requests.
    pub public_key: String,
    pub channel_id: String,
    pub discord_api_base: String,
    pub pm2_bin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            discord_token: String::new(),
            application_id: String::new(),
            public_key: String::new(),
            channel_id: String::new(),
            discord_api_base: "https://discord.com/api/v10".into(),
            pm2_bin: "pm2".into(),
        }
    }
}

/// Settings after validation, in the types the service runs with.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub bind: SocketAddr,
    pub discord_token: String,
    pub application_id: ApplicationId,
    pub public_key: VerifyingKey,
    pub channel: ChannelId,
    pub discord_api_base: Url,
    pub pm2_bin: PathBuf,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let env: HashMap<String, String> = std::env::vars().collect();
    load_settings_from(Some(SETTINGS_FILE), &env)
}

/// Layers defaults, the optional settings file, `APP__*` variables and the
/// legacy variables, in that order of precedence.
pub(crate) fn load_settings_from(
    file: Option<&str>,
    env: &HashMap<String, String>,
) -> anyhow::Result<Settings> {
    let defaults = Settings::default();
    let mut builder = Config::builder()
        .set_default("server_bind", defaults.server_bind)?
        .set_default("discord_token", defaults.discord_token)?
        .set_default("application_id", defaults.application_id)?
        .set_default("public_key", defaults.public_key)?
        .set_default("channel_id", defaults.channel_id)?
        .set_default("discord_api_base", defaults.discord_api_base)?
        .set_default("pm2_bin", defaults.pm2_bin)?;

    if let Some(file) = file {
        builder = builder.add_source(File::with_name(file).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .source(Some(env.clone())),
    );

    for (variable, key) in LEGACY_ENV {
        builder = builder.set_override_option(*key, env.get(*variable).cloned())?;
    }

    builder
        .build()
        .context("failed to assemble settings")?
        .try_deserialize()
        .context("failed to read settings")
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<PanelConfig> {
        let bind = self
            .server_bind
            .parse()
            .with_context(|| format!("invalid server_bind '{}'", self.server_bind))?;

        let discord_token = self.discord_token.trim();
        if discord_token.is_empty() {
            bail!("discord_token is required");
        }

        let application_id = parse_snowflake("application_id", &self.application_id)?;
        let channel = parse_snowflake("channel_id", &self.channel_id)?;

        let public_key = parse_public_key(&self.public_key)?;

        let discord_api_base = Url::parse(&self.discord_api_base)
            .with_context(|| format!("invalid discord_api_base '{}'", self.discord_api_base))?;
        if !matches!(discord_api_base.scheme(), "http" | "https") {
            bail!("discord_api_base must be an http(s) url");
        }

        if self.pm2_bin.trim().is_empty() {
            bail!("pm2_bin must not be empty");
        }

        Ok(PanelConfig {
            bind,
            discord_token: discord_token.to_string(),
            application_id: ApplicationId(application_id),
            public_key,
            channel: ChannelId(channel),
            discord_api_base,
            pm2_bin: PathBuf::from(self.pm2_bin.trim()),
        })
    }
}

fn parse_snowflake(field: &str, raw: &str) -> anyhow::Result<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("{field} is required");
    }
    raw.parse::<u64>()
        .with_context(|| format!("{field} must be a numeric id, got '{raw}'"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
