//! Catalog reconciliation.
//!
//! Merges freshly discovered releases with the known list, moves entries
//! carrying a pre-release marker out of the release list, and splices each
//! of them into the snapshot timeline next to the snapshot it is closest
//! to. Closeness is a two-part distance: the dominant part compares the
//! digits of both versions with marker and everything after it removed,
//! the tie-break compares release times.

use anyhow::Result;
use std::collections::HashSet;

use crate::error::AggregatorError;
use crate::model::PublishedVersion;
use crate::version::Version;

pub const PRE_RELEASE_MARKERS: [&str; 4] = ["ALPHA", "BETA", "RC", "SNAPSHOT"];

/// Union of known and freshly discovered releases, newest first.
///
/// Version identity wins over record contents: a version already present
/// keeps its existing record, so repeated runs are idempotent.
pub fn merge_releases(
    known: Vec<PublishedVersion>,
    discovered: Vec<PublishedVersion>,
) -> Vec<PublishedVersion> {
    let mut merged = known;
    let mut seen: HashSet<Version> = merged.iter().map(|r| r.version.clone()).collect();
    for release in discovered {
        if seen.insert(release.version.clone()) {
            merged.push(release);
        }
    }
    merged.sort_by(|a, b| b.cmp(a));
    merged
}

pub fn is_pre_release(version: &Version) -> bool {
    version
        .tokens()
        .any(|token| PRE_RELEASE_MARKERS.iter().any(|m| token.eq_ignore_ascii_case(m)))
}

/// Splits the merged release list into final releases and the pre-release
/// entries to be placed into the snapshot timeline, both keeping their
/// relative order.
pub fn split_pre_releases(
    merged: Vec<PublishedVersion>,
) -> (Vec<PublishedVersion>, Vec<PublishedVersion>) {
    merged
        .into_iter()
        .partition(|release| !is_pre_release(&release.version))
}

/// Byte offset of the first pre-release marker token, if any.
fn marker_offset(raw: &str) -> Option<usize> {
    let mut start = 0;
    for (index, byte) in raw.bytes().enumerate() {
        if byte == b'.' || byte == b'-' {
            if is_marker_token(&raw[start..index]) {
                return Some(start);
            }
            start = index + 1;
        }
    }
    if is_marker_token(&raw[start..]) {
        return Some(start);
    }
    None
}

fn is_marker_token(token: &str) -> bool {
    PRE_RELEASE_MARKERS.iter().any(|m| token.eq_ignore_ascii_case(m))
}

/// Digits of the version with the marker and everything after it removed,
/// read as one integer.
fn numeric_key(version: &Version) -> Result<u64> {
    let raw = version.as_str();
    let reduced = match marker_offset(raw) {
        Some(offset) => &raw[..offset],
        None => raw,
    };
    let digits: String = reduced.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse::<u64>()
        .map_err(|_| {
            AggregatorError::Validation {
                version: raw.to_string(),
            }
            .into()
        })
}

/// Splices one pre-release entry into the snapshot timeline.
///
/// The nearest snapshot by (numeric-key distance, release-time distance)
/// decides the position: the entry lands right after it when the snapshot
/// was released strictly later, right before it otherwise. Entries whose
/// version is already in the timeline are left alone.
pub fn place_pre_release(
    entry: PublishedVersion,
    timeline: &mut Vec<PublishedVersion>,
) -> Result<()> {
    if timeline.iter().any(|s| s.version == entry.version) {
        return Ok(());
    }
    if timeline.is_empty() {
        timeline.push(entry);
        return Ok(());
    }

    let entry_key = numeric_key(&entry.version)?;
    let mut chosen = 0usize;
    let mut best: Option<(u64, chrono::TimeDelta)> = None;
    for (index, snapshot) in timeline.iter().enumerate() {
        let snapshot_key = numeric_key(&snapshot.version)?;
        let distance = (
            entry_key.abs_diff(snapshot_key),
            (snapshot.release_time - entry.release_time).abs(),
        );
        if best.is_none_or(|b| distance < b) {
            best = Some(distance);
            chosen = index;
        }
    }

    if timeline[chosen].release_time > entry.release_time {
        timeline.insert(chosen + 1, entry);
    } else {
        timeline.insert(chosen, entry);
    }
    Ok(())
}
