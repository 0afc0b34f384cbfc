// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Streaming content hashes

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{OrdoError, Result};

/// Computes BLAKE3 content hashes with a fixed-size read buffer
#[derive(Debug, Clone)]
pub struct HashService {
    chunk_size: usize,
}

impl HashService {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Hex digest of the file's bytes. Memory use is bounded by the chunk size.
    pub fn hash_file(&self, path: &Path) -> Result<String> {
        let wrap = |source| OrdoError::Hash {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(wrap)?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.chunk_size];

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(wrap(e)),
            };
            hasher.update(&buffer[..read]);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }
}

impl Default for HashService {
    fn default() -> Self {
        Self::new(64 * 1024)
    }
}
