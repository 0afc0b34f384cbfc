// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The closed set of categories an entry can be sorted into

use serde::{Deserialize, Serialize};

/// Category assigned to a scanned entry.
///
/// Serialized as its label (`"Screenshot"`, `"Invoice"`, ...). The label is
/// also the name of the subdirectory created for the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Contract,
    Invoice,
    Screenshot,
    Manual,
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Code,
    Program,
    Shortcut,
    Folder,
    Download,
    Backup,
    Other,
}

impl Category {
    pub const ALL: [Category; 16] = [
        Self::Contract,
        Self::Invoice,
        Self::Screenshot,
        Self::Manual,
        Self::Image,
        Self::Video,
        Self::Audio,
        Self::Document,
        Self::Archive,
        Self::Code,
        Self::Program,
        Self::Shortcut,
        Self::Folder,
        Self::Download,
        Self::Backup,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contract => "Contract",
            Self::Invoice => "Invoice",
            Self::Screenshot => "Screenshot",
            Self::Manual => "Manual",
            Self::Image => "Image",
            Self::Video => "Video",
            Self::Audio => "Audio",
            Self::Document => "Document",
            Self::Archive => "Archive",
            Self::Code => "Code",
            Self::Program => "Program",
            Self::Shortcut => "Shortcut",
            Self::Folder => "Folder",
            Self::Download => "Download",
            Self::Backup => "Backup",
            Self::Other => "Other",
        }
    }

    /// Directory name used when the category receives its own folder
    pub fn folder_name(self) -> &'static str {
        self.as_str()
    }

    /// Lower-case label used as a name stem when nothing better is left
    pub fn name_label(self) -> String {
        self.as_str().to_lowercase()
    }

    /// Whether files of this category may ever get a category folder
    pub fn is_movable(self) -> bool {
        !matches!(self, Self::Shortcut | Self::Other)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}
