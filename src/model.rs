//! Canonical catalog data model.
//!
//! [`PublishedVersion`] is the persisted record for one build; the JSON
//! field names and omission rules must stay compatible with existing
//! `powernukkit-versions.json` files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::version::Version;

/// A packaged output of a single build, identified by its filename suffix.
///
/// The suffix table is used both to assemble download URLs from the search
/// endpoint's extension list and to classify files found in snapshot
/// directory listings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Artefact {
    ReducedJar,
    ReducedSourcesJar,
    ShadedJar,
    ShadedSourcesJar,
    JavadocJar,
}

impl Artefact {
    pub const ALL: [Artefact; 5] = [
        Artefact::ReducedJar,
        Artefact::ReducedSourcesJar,
        Artefact::ShadedJar,
        Artefact::ShadedSourcesJar,
        Artefact::JavadocJar,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Artefact::ReducedJar => ".jar",
            Artefact::ReducedSourcesJar => "-sources.jar",
            Artefact::ShadedJar => "-shaded.jar",
            Artefact::ShadedSourcesJar => "-shaded-sources.jar",
            Artefact::JavadocJar => "-javadoc.jar",
        }
    }

    pub fn by_extension(extension: &str) -> Option<Artefact> {
        Artefact::ALL
            .iter()
            .copied()
            .find(|a| a.extension() == extension)
    }
}

/// One published build, either an official release or a snapshot.
///
/// Identity key is `version`; records are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedVersion {
    pub version: Version,
    pub release_time: DateTime<Utc>,
    pub minecraft_version: Version,
    pub artefacts: BTreeSet<Artefact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_build: Option<u32>,
}

impl PublishedVersion {
    fn sort_key(&self) -> (&Version, &DateTime<Utc>, &Version, &Option<String>, String) {
        (
            &self.version,
            &self.release_time,
            &self.minecraft_version,
            &self.commit_id,
            format!("{:?}", self.artefacts),
        )
    }
}

impl Ord for PublishedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PublishedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Persisted catalog root: `{releases, snapshots}`.
///
/// No version appears twice within either list, and `releases` never holds
/// an entry whose version carries a pre-release marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionCatalog {
    pub releases: Vec<PublishedVersion>,
    pub snapshots: Vec<PublishedVersion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn published(version: &str, release_time: i64) -> PublishedVersion {
        PublishedVersion {
            version: Version::new(version),
            release_time: Utc.timestamp_opt(release_time, 0).unwrap(),
            minecraft_version: Version::new("1.19.50"),
            artefacts: BTreeSet::from([Artefact::ReducedJar, Artefact::ShadedJar]),
            commit_id: None,
            snapshot_build: None,
        }
    }

    #[test]
    fn artefact_suffix_table_round_trips() {
        for artefact in Artefact::ALL {
            assert_eq!(Artefact::by_extension(artefact.extension()), Some(artefact));
        }
        assert_eq!(Artefact::by_extension(".pom"), None);
    }

    #[test]
    fn artefacts_serialize_as_screaming_names() {
        let json = serde_json::to_string(&Artefact::ShadedSourcesJar).unwrap();
        assert_eq!(json, "\"SHADED_SOURCES_JAR\"");
    }

    #[test]
    fn version_dominates_the_sort_key() {
        let older = published("1.5.1.0-PN", 100);
        let newer = published("1.5.2.0-PN", 50);
        assert!(older < newer);
    }

    #[test]
    fn release_time_breaks_version_ties() {
        let first = published("1.5.1.0-PN", 100);
        let second = published("1.5.1.0-PN", 200);
        assert!(first < second);
    }

    #[test]
    fn absent_optionals_are_omitted_from_json() {
        let record = published("1.5.1.0-PN", 100);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("commitId"));
        assert!(!json.contains("snapshotBuild"));

        let back: PublishedVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn optionals_round_trip_when_present() {
        let mut record = published("1.19.50-SNAPSHOT-20220801.235959-7", 100);
        record.commit_id = Some("4a5b6c7d".to_string());
        record.snapshot_build = Some(7);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"commitId\":\"4a5b6c7d\""));
        assert!(json.contains("\"snapshotBuild\":7"));

        let back: PublishedVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
