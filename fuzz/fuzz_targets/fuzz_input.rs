// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use std::path::PathBuf;
use std::sync::Arc;

use ordo::config::RuleConfig;
use ordo::oracle::parse_oracle_response;
use ordo::scanner::extension_of;
use ordo::{classify, Category, FixedClock, RenameAdvisor, ScannedEntry};

#[derive(Arbitrary, Debug)]
struct Input {
    name: String,
    is_directory: bool,
    is_symlink: bool,
    oracle_text: String,
}

fuzz_target!(|input: Input| {
    if input.name.contains(['/', '\0']) {
        return;
    }

    let category = classify(&input.name, input.is_directory, input.is_symlink);
    assert_eq!(category, classify(&input.name, input.is_directory, input.is_symlink));

    let rules = RuleConfig {
        user_name: Some("fuzz".to_string()),
        ..RuleConfig::default()
    };
    let Some(day) = NaiveDate::from_ymd_opt(2024, 3, 1) else { return };
    let advisor = RenameAdvisor::new(&rules, Arc::new(FixedClock(day)));

    let entry = ScannedEntry {
        name: input.name.clone(),
        path: PathBuf::from("/fuzz").join(&input.name),
        size: 1,
        modified: None,
        extension: if input.is_directory { String::new() } else { extension_of(&input.name) },
        is_directory: input.is_directory,
        is_symlink: input.is_symlink,
    };
    let advice = advisor.advise(&entry, category);
    if advice.needs_rename {
        assert!(category != Category::Shortcut && !input.is_directory);

        // A suggested name is final
        let renamed = ScannedEntry {
            name: advice.suggested_name.clone(),
            extension: extension_of(&advice.suggested_name),
            ..entry
        };
        let category = classify(&renamed.name, false, false);
        assert!(!advisor.advise(&renamed, category).needs_rename, "{:?}", renamed.name);
    }

    let _ = parse_oracle_response(&input.oracle_text, &[input.name]);
});
