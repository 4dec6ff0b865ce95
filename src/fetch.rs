//! HTTP access and scoped temporary downloads.
//!
//! One shared agent serves both crawlers. Downloads land in named temporary
//! files that are removed on every exit path (success, extraction failure,
//! network failure) by the handle's drop. There are no retries and no
//! timeouts: a failed transfer aborts the whole run.

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::error::AggregatorError;

pub fn new_agent() -> ureq::Agent {
    ureq::Agent::new_with_defaults()
}

fn network_error(url: &str, reason: impl ToString) -> anyhow::Error {
    AggregatorError::Network {
        url: url.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Fetches a text resource (search response, metadata, listing page).
pub fn get_text(agent: &ureq::Agent, url: &str) -> Result<String> {
    let response = agent
        .get(url)
        .call()
        .map_err(|e| network_error(url, e))?;
    response
        .into_body()
        .read_to_string()
        .map_err(|e| network_error(url, e))
}

/// Streams a remote binary into a scoped temporary file.
///
/// The returned handle owns the file; dropping it removes the file no
/// matter how the caller's scan ends.
pub fn download_to_temp(agent: &ureq::Agent, url: &str, tag: &str) -> Result<NamedTempFile> {
    let response = agent
        .get(url)
        .call()
        .map_err(|e| network_error(url, e))?;

    let mut temp = tempfile::Builder::new()
        .prefix(&format!("powernukkit_{tag}_"))
        .suffix(".jar")
        .tempfile()
        .context("failed to create temporary download file")?;
    std::io::copy(&mut response.into_body().as_reader(), temp.as_file_mut())
        .map_err(|e| network_error(url, e))?;
    Ok(temp)
}
