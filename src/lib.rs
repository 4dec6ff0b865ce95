//! # powernukkit-versions
//!
//! Aggregates every published PowerNukkit build into one version catalog.
//!
//! ## Architecture
//!
//! - **version**: ordered version tokens with segment-wise comparison
//! - **model**: artefact kinds, published-version records and the catalog root
//! - **classfile**: embedded Minecraft version extraction from compiled classes
//! - **jar**: downloaded-JAR inspection (protocol class + git.properties)
//! - **fetch**: shared HTTP agent and scoped temporary downloads
//! - **maven**: release discovery through the Maven Central search endpoint
//! - **nexus**: snapshot discovery through the Nexus repository listings
//! - **reconcile**: merge, pre-release classification and timeline placement
//! - **store**: catalog file load/save
//! - **config**: explicit upstream/base-path configuration
//! - **error**: fatal failure categories of a run

pub mod classfile;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod jar;
pub mod maven;
pub mod model;
pub mod nexus;
pub mod reconcile;
pub mod store;
pub mod version;
