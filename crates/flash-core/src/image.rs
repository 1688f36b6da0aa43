// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable image descriptor. Created on discovery, destroyed on rescan —
//! this type carries no handle to the underlying file beyond its path.

use serde::{Deserialize, Serialize};

/// Compression scheme transparently decoded by the Image Source component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Dispatch on filename suffix, per spec §4.2.
    pub fn from_name(name: &str) -> Self {
        if name.ends_with(".gz") {
            Compression::Gzip
        } else if name.ends_with(".zst") {
            Compression::Zstd
        } else {
            Compression::None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    pub path: std::path::PathBuf,
    pub compressed: bool,
    /// Known only for plain images (file size) or compressed images whose
    /// container embeds an uncompressed-length field (e.g. a zstd frame
    /// header's content size).
    pub uncompressed_bytes: Option<u64>,
    pub digest: Option<String>,
}

impl Image {
    pub fn size_human(&self) -> Option<String> {
        self.uncompressed_bytes.map(crate::time_fmt::format_bytes)
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
