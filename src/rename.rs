// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Messy-name detection and name synthesis
//!
//! A name is "messy" when it carries no human meaning: hashes, UUIDs, camera
//! and capture-tool names, bare timestamps, placeholders and counters. Messy
//! names get a suggestion of the form `YYYYMMDD_<stem><ext>`, which is itself
//! never considered messy.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::category::Category;
use crate::config::RuleConfig;
use crate::scanner::ScannedEntry;

/// Names shorter than this are never flagged
const MIN_MESSY_CHARS: usize = 4;

const DOCUMENT_EXTENSIONS: &[&str] = &[
    ".doc", ".docx", ".pdf", ".txt", ".rtf", ".odt", ".xls", ".xlsx", ".csv", ".ods", ".ppt",
    ".pptx", ".odp", ".md", ".wps", ".pages", ".numbers", ".key",
];

static NORMALIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}_\D").expect("valid normalized-name regex"));

static MESSY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // hashes and ids
        r"^[0-9a-f]{16,}$",
        r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        r"^[0-9a-f]{8}(-[0-9a-f]{4}){1,3}$",
        // cameras and phones
        r"^(img|dsc[nf]?|pxl|mvimg|vid|gopr|dji|pano|burst)[_-]?\d{3,}",
        r"^mmexport\d{10,}",
        // capture tools, chat and meeting apps
        r"^(screenshot|screen ?shot|screen_shot)[ _-]*\d",
        r"^(屏幕截图|屏幕快照|截屏|截图)[ _-]*\d",
        r"^(snipaste|cleanshot)[ _-]*\d",
        r"^(微信图片|微信截图|wechat ?img|企业微信截图|qq截图|qq图片|钉钉截图|dingtalk|飞书截图|feishu|lark|腾讯会议|zoom)[ _-]*\d{4,}",
        // raw and compound timestamps
        r"^\d{8}[ _-]?\d{6}(\d{3})?$",
        r"^\d{10,13}$",
        r"^\d{4}-\d{2}-\d{2}[ _t-]\d{2}[.:_-]?\d{2}([.:_-]?\d{2})?$",
        // placeholders and copies
        r"^(untitled|unnamed|未命名|无标题|新建)",
        r"^new (document|file|folder|text document|image|microsoft \w+ document)",
        r"^(copy of |副本)",
        r"[ _-](copy|副本)([ _-]*\d+)?$",
        r"\s*\(\d+\)$",
        r"^(document|image|file|download)s?\d*$",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("valid messy-name regex"))
    .collect()
});

static CAPTURE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(img|dsc[nf]?|pxl|mvimg|vid|gopr|dji|screenshot|screen ?shot|snipaste|cleanshot|mmexport|wechat ?img|微信图片|微信截图|企业微信截图|qq截图|qq图片|钉钉截图|飞书截图|屏幕截图|屏幕快照|截屏|截图|copy of|副本|untitled|unnamed|未命名|无标题|new (text )?document|new file|新建(文本文档|文档)?)[ _-]*",
    )
    .expect("valid capture-prefix regex")
});

static LEADING_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4}[-_.]?\d{2}[-_.]?\d{2}|\d{10,13})([ _tT-]*\d{2}[-_.:]?\d{2}([-_.:]?\d{2})?(\d{3})?)?[ _-]*",
    )
    .expect("valid timestamp regex")
});

static TRAILING_COUNTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([ _-]*\(\d+\)|[ _-]+(copy|副本)([ _-]*\d+)?)+$").expect("valid counter regex")
});

static DATE_YMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"((?:19|20)\d{2})[-_./]?(0[1-9]|1[0-2])[-_./]?(0[1-9]|[12]\d|3[01])")
        .expect("valid date regex")
});

static DATE_CJK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"((?:19|20)\d{2})年(\d{1,2})月(\d{1,2})").expect("valid date regex")
});

static DATE_DMY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(0[1-9]|[12]\d|3[01])[-_.](0[1-9]|1[0-2])[-_.]((?:19|20)\d{2})")
        .expect("valid date regex")
});

/// Source of "today" for names that carry no date of their own
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Clock pinned to one day
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Outcome of [`RenameAdvisor::advise`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameAdvice {
    pub needs_rename: bool,
    /// The proposed name, or the current name when no rename is needed
    pub suggested_name: String,
}

/// Decides whether an entry needs a new name and proposes one
pub struct RenameAdvisor {
    user_name: String,
    screenshot_label: String,
    document_label: String,
    generic_label: String,
    max_chars: usize,
    clock: Arc<dyn Clock>,
}

impl RenameAdvisor {
    pub fn new(rules: &RuleConfig, clock: Arc<dyn Clock>) -> Self {
        let user_name = keep_allowed_chars(&rules.resolved_user_name());
        Self {
            user_name: if user_name.is_empty() { "user".to_string() } else { user_name },
            screenshot_label: rules.screenshot_label.clone(),
            document_label: rules.document_label.clone(),
            generic_label: rules.generic_label.clone(),
            max_chars: rules.name_max_chars,
            clock,
        }
    }

    pub fn advise(&self, entry: &ScannedEntry, category: Category) -> RenameAdvice {
        let renamable = !entry.is_directory && !entry.is_symlink && category != Category::Shortcut;
        if renamable && is_messy_name(entry.stem()) {
            RenameAdvice {
                needs_rename: true,
                suggested_name: self.synthesize_name(entry, category),
            }
        } else {
            RenameAdvice {
                needs_rename: false,
                suggested_name: entry.name.clone(),
            }
        }
    }

    /// Build `{date}_...{ext}` for an entry regardless of whether it is messy
    pub fn synthesize_name(&self, entry: &ScannedEntry, category: Category) -> String {
        let stem = entry.stem();
        let date = extract_date(stem)
            .or_else(|| {
                entry
                    .modified
                    .map(|m| m.with_timezone(&Local).date_naive())
            })
            .unwrap_or_else(|| self.clock.today());
        let date = date.format("%Y%m%d").to_string();
        let cleaned = clean_stem(stem, self.max_chars);
        let ext = &entry.extension;

        if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            let label = if cleaned.is_empty() { &self.document_label } else { &cleaned };
            format!("{date}_{}_{label}{ext}", self.user_name)
        } else if category == Category::Screenshot {
            format!("{date}_{}{ext}", self.screenshot_label)
        } else if !cleaned.is_empty() {
            format!("{date}_{cleaned}{ext}")
        } else {
            let label = match category {
                Category::Other => self.generic_label.clone(),
                other => other.name_label(),
            };
            format!("{date}_{label}{ext}")
        }
    }
}

/// Whether a name stem matches any messy-name pattern
pub fn is_messy_name(stem: &str) -> bool {
    let stem = stem.trim();
    if stem.chars().count() < MIN_MESSY_CHARS || NORMALIZED.is_match(stem) {
        return false;
    }
    looks_like_base36(stem) || MESSY_PATTERNS.iter().any(|re| re.is_match(stem))
}

fn looks_like_base36(stem: &str) -> bool {
    stem.len() >= 20
        && stem.chars().all(|c| c.is_ascii_alphanumeric())
        && stem.chars().any(|c| c.is_ascii_digit())
        && stem.chars().any(|c| c.is_ascii_alphabetic())
}

/// First plausible calendar date embedded in a name
pub fn extract_date(stem: &str) -> Option<NaiveDate> {
    let ymd = DATE_YMD.captures_iter(stem).find_map(|c| date_from(&c[1], &c[2], &c[3]));
    ymd.or_else(|| {
        DATE_CJK
            .captures_iter(stem)
            .find_map(|c| date_from(&c[1], &c[2], &c[3]))
    })
    .or_else(|| {
        DATE_DMY
            .captures_iter(stem)
            .find_map(|c| date_from(&c[3], &c[2], &c[1]))
    })
}

fn date_from(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Reduce a stem to its meaningful part: no capture prefixes, leading
/// timestamps, counters or foreign characters; at most `max_chars` long.
pub fn clean_stem(stem: &str, max_chars: usize) -> String {
    let stripped = CAPTURE_PREFIX.replace(stem.trim(), "");
    let stripped = LEADING_TIMESTAMP.replace(&stripped, "");
    let stripped = TRAILING_COUNTER.replace(&stripped, "");

    let spaced: String = stripped
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let mut clean = keep_allowed_chars(&spaced);
    while clean.contains("__") {
        clean = clean.replace("__", "_");
    }

    let truncated: String = clean.chars().take(max_chars).collect();
    let trimmed = truncated.trim().trim_matches(|c| c == '_' || c == '-').to_string();

    let only_digits = trimmed.chars().all(|c| c.is_ascii_digit() || c == '_' || c == '-');
    if only_digits || is_messy_name(&trimmed) {
        String::new()
    } else {
        trimmed
    }
}

fn keep_allowed_chars(s: &str) -> String {
    s.chars()
        .filter(|c| is_cjk(*c) || c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}' | '\u{f900}'..='\u{faff}')
}
