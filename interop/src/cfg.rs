use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::Identity,
    flow::FlowOptions,
    relay::{PollingRelay, RelayClient},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Identifier of the local network, sent to the relay with every request.
    pub network_id: String,
    /// Organization (MSP id) of the requesting identity.
    pub org: String,
    /// Address of the local relay, e.g. `localhost:9080`.
    pub relay_endpoint: String,
    /// How long to wait for the relay to produce a view. Defaults to 10 minutes.
    #[serde(default = "relay_timeout_default")]
    pub relay_timeout: Duration,
    /// Delay between polls of an in-flight relay request. Defaults to 1 second.
    #[serde(default = "relay_poll_interval_default")]
    pub relay_poll_interval: Duration,
    /// Remote views requested concurrently within one flow. Defaults to 1, fetching views one at a time.
    #[serde(default = "max_concurrent_fetches_default")]
    pub max_concurrent_fetches: usize,
    /// PEM file holding the PKCS#8 signing key.
    pub key_file: PathBuf,
    /// PEM file holding the certificate for the signing key.
    pub certificate_file: PathBuf,
}

pub fn relay_timeout_default() -> Duration {
    Duration::from_secs(600)
}

pub fn relay_poll_interval_default() -> Duration {
    Duration::from_secs(1)
}

pub fn max_concurrent_fetches_default() -> usize {
    1
}

impl Config {
    /// Reads the key and certificate files and decodes the signing key.
    pub fn load_identity(&self) -> Result<Identity> {
        let key = fs::read_to_string(&self.key_file)
            .with_context(|| format!("failed to read key file {:?}", self.key_file))?;
        let certificate = fs::read_to_string(&self.certificate_file).with_context(|| {
            format!(
                "failed to read certificate file {:?}",
                self.certificate_file
            )
        })?;
        Ok(Identity::new(
            &self.network_id,
            &self.org,
            &key,
            &certificate,
        )?)
    }

    /// A relay transport talking to `relay_endpoint` through `client`, with the configured timeout and
    /// poll interval.
    pub fn polling_relay<C: RelayClient>(&self, client: C) -> PollingRelay<C> {
        PollingRelay::new(
            client,
            &self.relay_endpoint,
            self.relay_timeout,
            self.relay_poll_interval,
        )
    }

    pub fn flow_options(&self, return_views_only: bool) -> FlowOptions {
        FlowOptions {
            return_views_only,
            max_concurrent_fetches: self.max_concurrent_fetches,
        }
    }
}

pub fn read_config(config_file: &Path) -> Result<Config> {
    let config_content = fs::read_to_string(config_file)
        .with_context(|| format!("failed to read config file {config_file:?}"))?;

    Ok(toml::from_str(&config_content)?)
}
