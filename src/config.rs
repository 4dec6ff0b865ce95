//! Explicit crawler configuration.
//!
//! Both upstream base locations and the catalog path are plain values
//! handed to the crawlers, so tests and unusual setups can point the tool
//! elsewhere. Running with no flags uses the fixed defaults below.

use std::path::PathBuf;

use crate::cli::Cli;

pub const MAVEN_SEARCH_BASE: &str = "https://search.maven.org";
pub const SNAPSHOT_BASE: &str =
    "https://oss.sonatype.org/content/repositories/snapshots/org/powernukkit/powernukkit";
pub const CATALOG_FILE: &str = "powernukkit-versions.json";

pub const GROUP_ID: &str = "org.powernukkit";
pub const ARTIFACT_ID: &str = "powernukkit";

#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub maven_base: String,
    pub snapshot_base: String,
    pub catalog_path: PathBuf,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            maven_base: MAVEN_SEARCH_BASE.to_string(),
            snapshot_base: SNAPSHOT_BASE.to_string(),
            catalog_path: PathBuf::from(CATALOG_FILE),
        }
    }
}

impl CrawlerConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();
        Self {
            maven_base: cli.maven_base.clone().unwrap_or(defaults.maven_base),
            snapshot_base: cli
                .snapshot_base
                .clone()
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.snapshot_base),
            catalog_path: cli.catalog.clone().unwrap_or(defaults.catalog_path),
        }
    }

    pub fn search_url(&self) -> String {
        format!(
            "{}/solrsearch/select?core=gav&wt=json&q=g:{GROUP_ID}+AND+a:{ARTIFACT_ID}+AND+p:jar",
            self.maven_base
        )
    }

    pub fn download_base(&self) -> String {
        format!("{}/remotecontent?filepath=", self.maven_base)
    }

    pub fn metadata_url(&self) -> String {
        format!("{}/maven-metadata.xml", self.snapshot_base)
    }

    /// Directory listing URL for one snapshot version family.
    pub fn family_url(&self, family: &str) -> String {
        format!("{}/{family}/", self.snapshot_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_urls_target_the_fixed_upstreams() {
        let config = CrawlerConfig::default();
        assert_eq!(
            config.search_url(),
            "https://search.maven.org/solrsearch/select?core=gav&wt=json&q=g:org.powernukkit+AND+a:powernukkit+AND+p:jar"
        );
        assert!(config.metadata_url().ends_with("/maven-metadata.xml"));
        assert_eq!(
            config.family_url("1.19.50-SNAPSHOT"),
            format!("{SNAPSHOT_BASE}/1.19.50-SNAPSHOT/")
        );
    }
}
