use anyhow::Result;
use clap::Parser;
use powernukkit_versions::cli::Cli;
use powernukkit_versions::config::CrawlerConfig;
use powernukkit_versions::model::{PublishedVersion, VersionCatalog};
use powernukkit_versions::version::Version;
use powernukkit_versions::{fetch, maven, nexus, reconcile, store};
use std::collections::{HashMap, HashSet};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CrawlerConfig::from_cli(&cli);

    println!("PowerNukkit version aggregator");
    println!(
        "The generated catalog ({}) can be used freely under the MIT license.",
        config.catalog_path.display()
    );
    println!("Processing, please wait...");

    let catalog = store::load(&config.catalog_path)?;
    let updated = aggregate(&config, catalog)?;
    store::save(&config.catalog_path, &updated)?;

    println!("Success.");
    Ok(())
}

/// One full aggregation pass: crawl both upstreams concurrently, merge,
/// reclassify pre-releases and splice them into the snapshot timeline.
fn aggregate(config: &CrawlerConfig, catalog: VersionCatalog) -> Result<VersionCatalog> {
    let agent = fetch::new_agent();

    let known_versions: HashSet<Version> = catalog
        .releases
        .iter()
        .chain(catalog.snapshots.iter())
        .map(|record| record.version.clone())
        .collect();
    let known_snapshots: HashMap<Version, PublishedVersion> = catalog
        .snapshots
        .iter()
        .map(|record| (record.version.clone(), record.clone()))
        .collect();

    let (discovered, timeline) = rayon::join(
        || maven::discover(&agent, config, &known_versions),
        || nexus::discover(&agent, config, &known_snapshots),
    );
    let discovered = discovered?;
    let mut timeline = timeline?;

    // Entries spliced into the timeline by earlier runs carry no snapshot
    // build ordinal and never reappear in the repository listings; they are
    // re-placed so repeated runs neither drop nor re-fetch them.
    let carried: Vec<PublishedVersion> = catalog
        .snapshots
        .iter()
        .filter(|record| record.snapshot_build.is_none())
        .cloned()
        .collect();

    let merged = reconcile::merge_releases(catalog.releases, discovered);
    let (releases, pre_releases) = reconcile::split_pre_releases(merged);
    for entry in carried.into_iter().chain(pre_releases) {
        reconcile::place_pre_release(entry, &mut timeline)?;
    }

    Ok(VersionCatalog {
        releases,
        snapshots: timeline,
    })
}
