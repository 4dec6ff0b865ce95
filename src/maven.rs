//! Release discovery through the Maven Central search endpoint.
//!
//! One search query lists every published `org.powernukkit:powernukkit`
//! jar; each hit not already in the catalog is downloaded and scanned
//! concurrently. A non-zero status in the response header, or any failed
//! fetch or extraction, aborts the run.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

use crate::config::CrawlerConfig;
use crate::fetch;
use crate::jar;
use crate::model::{Artefact, PublishedVersion};
use crate::version::Version;

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "responseHeader")]
    pub response_header: ResponseHeader,
    pub response: SearchHits,
}

#[derive(Debug, Deserialize)]
pub struct ResponseHeader {
    pub status: i32,
}

#[derive(Debug, Deserialize)]
pub struct SearchHits {
    #[serde(rename = "numFound")]
    pub found: u32,
    pub start: u32,
    #[serde(rename = "docs")]
    pub releases: Vec<MavenRelease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MavenRelease {
    pub id: String,
    #[serde(rename = "g")]
    pub group: String,
    #[serde(rename = "a")]
    pub artefact: String,
    #[serde(rename = "v")]
    pub version: Version,
    #[serde(rename = "p")]
    pub packaging: String,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub release_time: DateTime<Utc>,
    #[serde(rename = "ec", default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MavenRelease {
    /// Download URLs for every extension the suffix table knows about.
    pub fn download_urls(&self, download_base: &str) -> BTreeMap<Artefact, String> {
        let stem = format!(
            "{download_base}{}/{}/{}/{}-{}",
            self.group.replace('.', "/"),
            self.artefact,
            self.version,
            self.artefact,
            self.version,
        );
        self.extensions
            .iter()
            .filter_map(|extension| {
                Artefact::by_extension(extension).map(|a| (a, format!("{stem}{extension}")))
            })
            .collect()
    }
}

/// Queries the search endpoint and imports every release that is not
/// already known.
pub fn discover(
    agent: &ureq::Agent,
    config: &CrawlerConfig,
    known_versions: &HashSet<Version>,
) -> Result<Vec<PublishedVersion>> {
    let url = config.search_url();
    let body = fetch::get_text(agent, &url)?;
    let parsed: SearchResponse = serde_json::from_str(&body)
        .with_context(|| format!("unexpected search response from {url}"))?;
    if parsed.response_header.status != 0 {
        bail!(
            "search endpoint {url} reported status {}",
            parsed.response_header.status
        );
    }

    let download_base = config.download_base();
    let candidates: Vec<(MavenRelease, BTreeMap<Artefact, String>, String)> = parsed
        .response
        .releases
        .into_iter()
        .filter(|release| !known_versions.contains(&release.version))
        .filter_map(|release| {
            let urls = release.download_urls(&download_base);
            // Hits publishing neither binary kind are skipped, not errors.
            let jar_url = urls
                .get(&Artefact::ReducedJar)
                .or_else(|| urls.get(&Artefact::ShadedJar))?
                .clone();
            Some((release, urls, jar_url))
        })
        .collect();

    candidates
        .into_par_iter()
        .map(|(release, urls, jar_url)| {
            let temp = fetch::download_to_temp(agent, &jar_url, release.version.as_str())?;
            let contents = jar::scan_jar(temp.path())?;
            Ok(PublishedVersion {
                version: release.version,
                release_time: release.release_time,
                minecraft_version: contents.minecraft_version,
                artefacts: urls.into_keys().collect(),
                commit_id: contents.commit_id,
                snapshot_build: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "responseHeader": {"status": 0, "QTime": 3, "params": {"q": "g:org.powernukkit"}},
        "response": {
            "numFound": 2,
            "start": 0,
            "docs": [
                {
                    "id": "org.powernukkit:powernukkit:1.6.0.1-PN",
                    "g": "org.powernukkit",
                    "a": "powernukkit",
                    "v": "1.6.0.1-PN",
                    "p": "jar",
                    "timestamp": 1659398399000,
                    "ec": ["-sources.jar", ".jar", "-shaded.jar", ".pom"],
                    "tags": ["server"]
                },
                {
                    "id": "org.powernukkit:powernukkit:1.5.2.1-PN",
                    "g": "org.powernukkit",
                    "a": "powernukkit",
                    "v": "1.5.2.1-PN",
                    "p": "jar",
                    "timestamp": 1640995200000,
                    "ec": [".pom"]
                }
            ]
        }
    }"#;

    #[test]
    fn search_response_deserializes_with_millisecond_timestamps() {
        let parsed: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(parsed.response_header.status, 0);
        assert_eq!(parsed.response.found, 2);
        let release = &parsed.response.releases[0];
        assert_eq!(release.version, Version::new("1.6.0.1-PN"));
        assert_eq!(
            release.release_time.to_rfc3339(),
            "2022-08-01T23:59:59+00:00"
        );
    }

    #[test]
    fn download_urls_map_known_extensions_only() {
        let parsed: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        let urls = parsed.response.releases[0]
            .download_urls("https://search.maven.org/remotecontent?filepath=");
        assert_eq!(urls.len(), 3);
        assert_eq!(
            urls.get(&Artefact::ReducedJar).map(String::as_str),
            Some(
                "https://search.maven.org/remotecontent?filepath=org/powernukkit/powernukkit/1.6.0.1-PN/powernukkit-1.6.0.1-PN.jar"
            )
        );
        assert!(urls.contains_key(&Artefact::ShadedJar));
        assert!(urls.contains_key(&Artefact::ReducedSourcesJar));
    }

    #[test]
    fn hits_without_any_binary_kind_have_no_candidate_url() {
        let parsed: SearchResponse = serde_json::from_str(SAMPLE).unwrap();
        let urls = parsed.response.releases[1]
            .download_urls("https://search.maven.org/remotecontent?filepath=");
        assert!(urls.get(&Artefact::ReducedJar).is_none());
        assert!(urls.get(&Artefact::ShadedJar).is_none());
    }
}
