//! Store stream consumption
//!
//! Drains one `Series` response stream into a [`SeriesMerger`], collecting
//! warnings on the side. The warning policy is applied only once the stream
//! has ended cleanly; a transport error always wins over warnings.

use std::fmt;
use std::str::FromStr;

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use super::error::{ReadError, ReadResult};
use super::merge::SeriesMerger;
use crate::proto::storepb::series_response::Payload;
use crate::store::SeriesStream;

/// What to do when the store reports warnings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningPolicy {
    /// Fail the query with every warning received
    #[default]
    Fail,
    /// Log the warnings and return the data
    Ignore,
}

impl WarningPolicy {
    /// Apply the policy to the warnings of a cleanly finished stream
    pub fn check(self, warnings: Vec<String>) -> ReadResult<()> {
        if warnings.is_empty() {
            return Ok(());
        }
        match self {
            WarningPolicy::Fail => Err(ReadError::BackendWarning(warnings)),
            WarningPolicy::Ignore => {
                for warning in &warnings {
                    tracing::warn!(warning = %warning, "Ignoring store warning");
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for WarningPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningPolicy::Fail => write!(f, "fail"),
            WarningPolicy::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for WarningPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(WarningPolicy::Fail),
            "ignore" => Ok(WarningPolicy::Ignore),
            other => Err(format!(
                "unknown warning policy '{}', expected 'fail' or 'ignore'",
                other
            )),
        }
    }
}

/// Feed every series of `stream` into `merger` and return the warnings
///
/// Stops at the first transport error.
pub async fn drain(mut stream: SeriesStream, merger: &mut SeriesMerger<'_>) -> ReadResult<Vec<String>> {
    let mut warnings = Vec::new();

    while let Some(response) = stream.next().await {
        match response?.payload {
            Some(Payload::Series(series)) => merger.push(series),
            Some(Payload::Warning(warning)) => {
                tracing::warn!(warning = %warning, "Store returned warning");
                warnings.push(warning);
            }
            None => tracing::trace!("Skipping store response without known payload"),
        }
    }

    Ok(warnings)
}
