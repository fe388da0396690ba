use tracing::{debug, warn};

use bistage_domain::{RuntimeFamily, RuntimeVersion};

use crate::context::CommandContext;

/// Legacy channel the staged sources can never run on: they import the
/// `io` module that CPython only grew in 2.6.
const UNSUPPORTED_LEGACY_CHANNEL: &str = "2.5";

/// Supported interpreter versions for a family, in host order with
/// duplicates collapsed. Discovery never fails: a family whose versions
/// cannot be determined is simply empty.
pub fn discover(ctx: &CommandContext, family: RuntimeFamily) -> Vec<RuntimeVersion> {
    if let Some(tokens) = ctx.config().discovery().override_for(family) {
        debug!(family = %family, count = tokens.len(), "using configured version list");
        return parse_tokens(family, tokens.iter().map(String::as_str));
    }
    match ctx.lister().list(family) {
        Ok(tokens) => parse_tokens(family, tokens.iter().map(String::as_str)),
        Err(err) => {
            warn!(
                family = %family,
                error = %err,
                "version listing failed; treating family as absent"
            );
            Vec::new()
        }
    }
}

fn parse_tokens<'a>(
    family: RuntimeFamily,
    tokens: impl Iterator<Item = &'a str>,
) -> Vec<RuntimeVersion> {
    let mut versions = Vec::new();
    for token in tokens {
        let version = match RuntimeVersion::from_token(family, token) {
            Ok(version) => version,
            Err(err) => {
                debug!(family = %family, token, error = %err, "ignoring version token");
                continue;
            }
        };
        if family == RuntimeFamily::Legacy && version.channel() == UNSUPPORTED_LEGACY_CHANNEL {
            debug!(family = %family, token, "dropping unsupported legacy channel");
            continue;
        }
        if versions.contains(&version) {
            continue;
        }
        versions.push(version);
    }
    versions
}
