use std::fmt;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::RuntimeFamily;

/// A discovered interpreter version: a family plus its `X.Y` channel.
///
/// Construction normalizes the channel to `major.minor` and rejects channels
/// whose major component disagrees with the family, so a `RuntimeVersion`
/// can never point a legacy build at a modern interpreter or vice versa.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuntimeVersion {
    family: RuntimeFamily,
    channel: String,
}

impl RuntimeVersion {
    pub fn new(family: RuntimeFamily, channel: &str) -> Result<Self> {
        let (major, minor) = parse_channel_pair(channel)?;
        if major != family.major() {
            bail!("channel {channel} does not belong to {family}");
        }
        Ok(Self {
            family,
            channel: format!("{major}.{minor}"),
        })
    }

    /// Parses a discovery token, tolerating the `pythonX.Y` binary-name form
    /// some listing helpers emit alongside bare `X.Y` channels.
    pub fn from_token(family: RuntimeFamily, token: &str) -> Result<Self> {
        let channel = token.strip_prefix("python").unwrap_or(token);
        Self::new(family, channel)
    }

    #[must_use]
    pub fn family(&self) -> RuntimeFamily {
        self.family
    }

    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Interpreter binary name for this version, e.g. `python2.7`.
    #[must_use]
    pub fn interpreter(&self) -> String {
        format!("python{}", self.channel)
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.channel)
    }
}

fn parse_channel_pair(input: &str) -> Result<(u64, u64)> {
    let mut parts = input.split('.');
    let major = parts
        .next()
        .ok_or_else(|| anyhow!("channel missing major component"))?
        .parse::<u64>()
        .map_err(|_| anyhow!("invalid channel `{input}`"))?;
    let minor = parts
        .next()
        .ok_or_else(|| anyhow!("channel `{input}` missing minor component"))?
        .parse::<u64>()
        .map_err(|_| anyhow!("invalid channel `{input}`"))?;
    Ok((major, minor))
}
