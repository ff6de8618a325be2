//! Replays recorded dispatcher calls against an integration, playing the part
//! of the host: it keeps the current user up to date on identify.

use std::io::BufRead;

use affiliate_core::Traits;
use affiliate_web_sdk::{IdentifiedUser, Integration, Properties};
use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, warn};

/// One recorded dispatcher call, as a JSON line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HostCall {
    Initialize,
    Identify {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(default)]
        traits: Option<Traits>,
    },
    Track {
        event: String,
        #[serde(default)]
        properties: Option<Properties>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub calls: usize,
    pub skipped: usize,
}

pub fn replay<R: BufRead>(
    input: R,
    integration: &dyn Integration,
    user: &IdentifiedUser,
) -> anyhow::Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for (idx, line) in input.lines().enumerate() {
        let line = line.context("failed to read input line")?;
        if line.trim().is_empty() {
            continue;
        }
        let call: HostCall = serde_json::from_str(&line)
            .with_context(|| format!("line {}: not a host call", idx + 1))?;

        match call {
            HostCall::Initialize => integration.initialize()?,
            HostCall::Identify { user_id, traits } => {
                integration.identify(&user_id, traits.as_ref())?;
                user.identify(Some(user_id), traits.unwrap_or_default());
            }
            HostCall::Track { event, properties } => {
                integration.track(&event, properties.as_ref())?
            }
            HostCall::Unsupported => {
                warn!(line = idx + 1, "unsupported call type, skipped");
                stats.skipped += 1;
                continue;
            }
        }
        debug!(line = idx + 1, "call replayed");
        stats.calls += 1;
    }

    Ok(stats)
}
