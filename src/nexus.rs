//! Snapshot discovery through the Nexus snapshot repository.
//!
//! `maven-metadata.xml` lists the version families; each family's directory
//! listing page is crawled for artefact links. File names encode base
//! version, publication timestamp, build ordinal and artefact kind, which
//! is everything needed to assemble builds without touching most of the
//! binaries: only builds not already in the catalog are downloaded.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use crate::config::CrawlerConfig;
use crate::fetch;
use crate::jar;
use crate::model::{Artefact, PublishedVersion};
use crate::version::Version;

#[derive(Debug, Deserialize)]
struct MavenMetadata {
    versioning: Versioning,
}

#[derive(Debug, Deserialize)]
struct Versioning {
    versions: VersionList,
}

#[derive(Debug, Deserialize)]
struct VersionList {
    #[serde(default, rename = "version")]
    version: Vec<String>,
}

/// Ordered version-family list from `maven-metadata.xml`.
pub fn parse_families(metadata_xml: &str) -> Result<Vec<String>> {
    let metadata: MavenMetadata =
        quick_xml::de::from_str(metadata_xml).context("unexpected snapshot metadata document")?;
    Ok(metadata
        .versioning
        .versions
        .version
        .into_iter()
        .map(|family| family.trim().to_string())
        .collect())
}

/// One artefact link parsed out of a family listing page.
#[derive(Debug, Clone)]
struct SnapshotArtefact {
    base: String,
    date_time: DateTime<Utc>,
    build: u32,
    artefact: Artefact,
    url: String,
}

/// One assembled build: every artefact kind published for the same
/// (base version, timestamp, ordinal).
#[derive(Debug, Clone)]
struct SnapshotBuild {
    version: Version,
    release_time: DateTime<Utc>,
    build: u32,
    artefacts: BTreeMap<Artefact, String>,
}

fn href_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"href="([^"]*)""#).expect("href pattern is valid"))
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^powernukkit-(?P<base>.+?)-(?P<date>\d{8})\.(?P<time>\d{6})-(?P<build>\d+)(?P<kind>-(?:shaded-sources|shaded|sources|javadoc))?\.jar$",
        )
        .expect("filename pattern is valid")
    })
}

/// Extracts artefact links from a listing page. Links not matching the
/// filename pattern are discarded silently.
fn parse_listing(listing_html: &str, family_url: &str) -> Result<Vec<SnapshotArtefact>> {
    let mut artefacts = Vec::new();
    for capture in href_pattern().captures_iter(listing_html) {
        let href = &capture[1];
        let filename = href.rsplit('/').next().unwrap_or(href);
        let Some(parts) = filename_pattern().captures(filename) else {
            continue;
        };

        let extension = format!(
            "{}.jar",
            parts.name("kind").map(|m| m.as_str()).unwrap_or("")
        );
        let Some(artefact) = Artefact::by_extension(&extension) else {
            continue;
        };

        let date_time = NaiveDateTime::parse_from_str(
            &format!("{}{}", &parts["date"], &parts["time"]),
            "%Y%m%d%H%M%S",
        )
        .with_context(|| format!("invalid timestamp in listing entry {filename}"))?
        .and_utc();
        let build = parts["build"]
            .parse::<u32>()
            .with_context(|| format!("invalid build ordinal in listing entry {filename}"))?;

        artefacts.push(SnapshotArtefact {
            base: parts["base"].to_string(),
            date_time,
            build,
            artefact,
            url: resolve_href(family_url, href),
        });
    }
    Ok(artefacts)
}

fn resolve_href(family_url: &str, href: &str) -> String {
    if href.contains("://") {
        href.to_string()
    } else {
        format!("{family_url}{}", href.trim_start_matches('/'))
    }
}

fn composite_version(base: &str, date_time: &DateTime<Utc>, build: u32) -> Version {
    Version::new(format!(
        "{base}-{}-{build}",
        date_time.format("%Y%m%d.%H%M%S")
    ))
}

/// Groups listing artefacts into builds keyed by their composite version.
fn group_builds(artefacts: Vec<SnapshotArtefact>) -> Vec<SnapshotBuild> {
    let mut builds: Vec<SnapshotBuild> = Vec::new();
    let mut index_by_version: HashMap<Version, usize> = HashMap::new();
    for artefact in artefacts {
        let version = composite_version(&artefact.base, &artefact.date_time, artefact.build);
        let index = *index_by_version.entry(version.clone()).or_insert_with(|| {
            builds.push(SnapshotBuild {
                version,
                release_time: artefact.date_time,
                build: artefact.build,
                artefacts: BTreeMap::new(),
            });
            builds.len() - 1
        });
        builds[index]
            .artefacts
            .insert(artefact.artefact, artefact.url);
    }
    builds
}

/// Crawls every snapshot family and returns the full snapshot timeline,
/// newest first. Builds already present in `known_snapshots` are reused
/// verbatim without a fetch.
pub fn discover(
    agent: &ureq::Agent,
    config: &CrawlerConfig,
    known_snapshots: &HashMap<Version, PublishedVersion>,
) -> Result<Vec<PublishedVersion>> {
    let metadata_xml = fetch::get_text(agent, &config.metadata_url())?;
    let families = parse_families(&metadata_xml)?;

    let per_family: Vec<Vec<PublishedVersion>> = families
        .par_iter()
        .map(|family| scan_family(agent, config, family, known_snapshots))
        .collect::<Result<_>>()?;

    let mut snapshots: Vec<PublishedVersion> = per_family.into_iter().flatten().collect();
    snapshots.sort_by(|a, b| b.cmp(a));
    Ok(snapshots)
}

fn scan_family(
    agent: &ureq::Agent,
    config: &CrawlerConfig,
    family: &str,
    known_snapshots: &HashMap<Version, PublishedVersion>,
) -> Result<Vec<PublishedVersion>> {
    let family_url = config.family_url(family);
    let listing_html = fetch::get_text(agent, &family_url)?;
    let builds = group_builds(parse_listing(&listing_html, &family_url)?);

    builds
        .into_par_iter()
        .filter_map(|build| {
            // Builds publishing neither binary kind are discarded.
            let jar_url = build
                .artefacts
                .get(&Artefact::ReducedJar)
                .or_else(|| build.artefacts.get(&Artefact::ShadedJar))?
                .clone();
            Some((build, jar_url))
        })
        .map(|(build, jar_url)| {
            if let Some(known) = known_snapshots.get(&build.version) {
                return Ok(known.clone());
            }
            let temp = fetch::download_to_temp(agent, &jar_url, build.version.as_str())?;
            let contents = jar::scan_jar(temp.path())?;
            Ok(PublishedVersion {
                version: build.version,
                release_time: build.release_time,
                minecraft_version: contents.minecraft_version,
                artefacts: build.artefacts.into_keys().collect(),
                commit_id: contents.commit_id,
                snapshot_build: Some(build.build),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.powernukkit</groupId>
  <artifactId>powernukkit</artifactId>
  <versioning>
    <versions>
      <version>1.19.40-SNAPSHOT</version>
      <version>1.19.50-SNAPSHOT</version>
    </versions>
    <lastUpdated>20220801235959</lastUpdated>
  </versioning>
</metadata>"#;

    #[test]
    fn metadata_families_parse_in_document_order() {
        let families = parse_families(METADATA).unwrap();
        assert_eq!(families, vec!["1.19.40-SNAPSHOT", "1.19.50-SNAPSHOT"]);
    }

    #[test]
    fn filename_pattern_captures_all_parts() {
        let parts = filename_pattern()
            .captures("powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar")
            .unwrap();
        assert_eq!(&parts["base"], "1.19.50-SNAPSHOT");
        assert_eq!(&parts["date"], "20220801");
        assert_eq!(&parts["time"], "235959");
        assert_eq!(&parts["build"], "7");
        assert!(parts.name("kind").is_none());
    }

    #[test]
    fn filename_pattern_maps_suffixes_through_the_artefact_table() {
        for (name, expected) in [
            ("powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar", Artefact::ReducedJar),
            (
                "powernukkit-1.19.50-SNAPSHOT-20220801.235959-7-shaded.jar",
                Artefact::ShadedJar,
            ),
            (
                "powernukkit-1.19.50-SNAPSHOT-20220801.235959-7-shaded-sources.jar",
                Artefact::ShadedSourcesJar,
            ),
            (
                "powernukkit-1.19.50-SNAPSHOT-20220801.235959-7-sources.jar",
                Artefact::ReducedSourcesJar,
            ),
            (
                "powernukkit-1.19.50-SNAPSHOT-20220801.235959-7-javadoc.jar",
                Artefact::JavadocJar,
            ),
        ] {
            let parts = filename_pattern().captures(name).unwrap();
            let extension = format!(
                "{}.jar",
                parts.name("kind").map(|m| m.as_str()).unwrap_or("")
            );
            assert_eq!(Artefact::by_extension(&extension), Some(expected), "{name}");
        }
    }

    #[test]
    fn unrelated_links_are_discarded_silently() {
        let html = r#"
            <a href="../">Parent Directory</a>
            <a href="powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar.sha1">checksum</a>
            <a href="powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.pom">pom</a>
            <a href="powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar">jar</a>
        "#;
        let artefacts = parse_listing(html, "https://repo.test/1.19.50-SNAPSHOT/").unwrap();
        assert_eq!(artefacts.len(), 1);
        assert_eq!(artefacts[0].artefact, Artefact::ReducedJar);
        assert_eq!(
            artefacts[0].url,
            "https://repo.test/1.19.50-SNAPSHOT/powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar"
        );
    }

    #[test]
    fn absolute_hrefs_keep_their_location() {
        let html = r#"<a href="https://oss.test/repo/1.19.50-SNAPSHOT/powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar">jar</a>"#;
        let artefacts = parse_listing(html, "https://repo.test/1.19.50-SNAPSHOT/").unwrap();
        assert_eq!(
            artefacts[0].url,
            "https://oss.test/repo/1.19.50-SNAPSHOT/powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar"
        );
    }

    #[test]
    fn builds_group_by_version_timestamp_and_ordinal() {
        let html = r#"
            <a href="powernukkit-1.19.50-SNAPSHOT-20220801.235959-7.jar">a</a>
            <a href="powernukkit-1.19.50-SNAPSHOT-20220801.235959-7-shaded.jar">b</a>
            <a href="powernukkit-1.19.50-SNAPSHOT-20220802.000010-8.jar">c</a>
        "#;
        let builds = group_builds(parse_listing(html, "https://repo.test/f/").unwrap());
        assert_eq!(builds.len(), 2);

        let seven = &builds[0];
        assert_eq!(
            seven.version,
            Version::new("1.19.50-SNAPSHOT-20220801.235959-7")
        );
        assert_eq!(seven.build, 7);
        assert_eq!(seven.release_time.to_rfc3339(), "2022-08-01T23:59:59+00:00");
        assert_eq!(seven.artefacts.len(), 2);

        let eight = &builds[1];
        assert_eq!(
            eight.version,
            Version::new("1.19.50-SNAPSHOT-20220802.000010-8")
        );
        assert_eq!(eight.artefacts.len(), 1);
    }

    #[test]
    fn sources_only_builds_lack_a_binary_candidate() {
        let html = r#"
            <a href="powernukkit-1.19.50-SNAPSHOT-20220801.235959-7-sources.jar">s</a>
        "#;
        let builds = group_builds(parse_listing(html, "https://repo.test/f/").unwrap());
        assert_eq!(builds.len(), 1);
        assert!(builds[0].artefacts.get(&Artefact::ReducedJar).is_none());
        assert!(builds[0].artefacts.get(&Artefact::ShadedJar).is_none());
    }
}
