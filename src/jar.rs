//! Inspection of a downloaded PowerNukkit JAR.
//!
//! Pulls the `ProtocolInfo` class out of the archive for the embedded
//! version extractor and reads `git.properties` for the commit the build
//! was made from. The JAR is never executed.

use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::classfile;
use crate::version::Version;

const PROTOCOL_INFO_ENTRY: &str = "cn/nukkit/network/protocol/ProtocolInfo.class";
const GIT_PROPERTIES_ENTRY: &str = "git.properties";
const COMMIT_ID_KEY: &str = "git.commit.id";

/// Metadata recovered from one downloaded binary.
#[derive(Debug, Clone)]
pub struct JarContents {
    pub minecraft_version: Version,
    pub commit_id: Option<String>,
}

pub fn scan_jar(jar_path: &Path) -> Result<JarContents> {
    let file = File::open(jar_path)
        .with_context(|| format!("failed to open jar: {}", jar_path.display()))?;
    // SAFETY: The file is opened read-only and remains valid for the lifetime
    // of the mmap. The mmap is dropped before the file, ensuring memory safety.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("failed to mmap jar: {}", jar_path.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(&mmap[..]))
        .with_context(|| format!("failed to parse zip (jar): {}", jar_path.display()))?;

    let class_bytes = read_entry(&mut archive, PROTOCOL_INFO_ENTRY)
        .with_context(|| format!("no protocol class in {}", jar_path.display()))?;
    let minecraft_version = classfile::extract_embedded_version(&class_bytes)
        .with_context(|| format!("in {}", jar_path.display()))?;
    let commit_id = read_commit_id(&mut archive);

    Ok(JarContents {
        minecraft_version: Version::new(minecraft_version),
        commit_id,
    })
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("missing jar entry: {name}"))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Builds without `git.properties` (or with an unreadable one) simply have
/// no commit id.
fn read_commit_id<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Option<String> {
    let bytes = read_entry(archive, GIT_PROPERTIES_ENTRY).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    properties_value(&text, COMMIT_ID_KEY)
}

/// Minimal Java properties lookup: `key=value` or `key: value` lines,
/// `#`/`!` comments.
fn properties_value(text: &str, key: &str) -> Option<String> {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((name, value)) = line.split_once(['=', ':']) else {
            continue;
        };
        if name.trim() == key {
            return Some(value.trim().to_string());
        }
    }
    None
}
