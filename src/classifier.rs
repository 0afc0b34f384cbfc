// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Rule-based classification of names into categories
//!
//! Resolution order, first match wins:
//! 1. symlinks are shortcuts
//! 2. directories: project markers, then folder keywords, else `Folder`
//! 3. link-file extensions are shortcuts
//! 4. name keywords (they beat the extension)
//! 5. images whose name looks like a screenshot
//! 6. extension table
//! 7. `Other`

use crate::category::Category;
use crate::scanner::extension_of;

/// Directory names that mark a dependency, build or VCS tree
const PROJECT_MARKERS: &[&str] = &[
    "node_modules", ".git", ".svn", ".hg", "target", "build", "dist", "out",
    ".idea", ".vscode", "__pycache__", "venv", ".venv", "vendor", ".gradle",
    "cmake-build-debug", "cmake-build-release",
];

const FOLDER_KEYWORDS: &[(&str, Category)] = &[
    ("图片", Category::Image),
    ("照片", Category::Image),
    ("相册", Category::Image),
    ("images", Category::Image),
    ("pictures", Category::Image),
    ("photos", Category::Image),
    ("视频", Category::Video),
    ("电影", Category::Video),
    ("videos", Category::Video),
    ("movies", Category::Video),
    ("音乐", Category::Audio),
    ("录音", Category::Audio),
    ("music", Category::Audio),
    ("audio", Category::Audio),
    ("文档", Category::Document),
    ("资料", Category::Document),
    ("documents", Category::Document),
    ("docs", Category::Document),
    ("代码", Category::Code),
    ("项目", Category::Code),
    ("projects", Category::Code),
    ("repos", Category::Code),
    ("code", Category::Code),
    ("下载", Category::Download),
    ("downloads", Category::Download),
    ("备份", Category::Backup),
    ("backup", Category::Backup),
    ("软件", Category::Program),
    ("安装包", Category::Program),
    ("programs", Category::Program),
    ("software", Category::Program),
    ("installers", Category::Program),
];

const SHORTCUT_EXTENSIONS: &[&str] = &[".lnk", ".url", ".webloc", ".desktop", ".alias"];

/// Ordered: the first keyword found in the name decides
const NAME_KEYWORDS: &[(&str, Category)] = &[
    ("发票", Category::Invoice),
    ("收据", Category::Invoice),
    ("账单", Category::Invoice),
    ("invoice", Category::Invoice),
    ("receipt", Category::Invoice),
    ("合同", Category::Contract),
    ("协议", Category::Contract),
    ("contract", Category::Contract),
    ("agreement", Category::Contract),
    ("截图", Category::Screenshot),
    ("截屏", Category::Screenshot),
    ("screenshot", Category::Screenshot),
    ("screen shot", Category::Screenshot),
    ("说明书", Category::Manual),
    ("手册", Category::Manual),
    ("指南", Category::Manual),
    ("manual", Category::Manual),
    ("guide", Category::Manual),
    ("handbook", Category::Manual),
    ("简历", Category::Document),
    ("报告", Category::Document),
    ("resume", Category::Document),
    ("report", Category::Document),
];

/// Image names produced by capture tools that don't say "screenshot"
const SCREENSHOT_TOKENS: &[&str] = &[
    "snipaste", "screencapture", "screen_shot", "cleanshot", "屏幕快照", "capture",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".heic", ".heif", ".tiff", ".tif",
    ".svg", ".ico", ".raw", ".cr2", ".nef", ".avif", ".psd",
];

const EXTENSION_TABLE: &[(&[&str], Category)] = &[
    (IMAGE_EXTENSIONS, Category::Image),
    (
        &[".mp4", ".mov", ".avi", ".mkv", ".wmv", ".flv", ".webm", ".m4v", ".3gp", ".mpg", ".mpeg"],
        Category::Video,
    ),
    (
        &[".mp3", ".wav", ".flac", ".aac", ".ogg", ".m4a", ".wma", ".opus", ".amr"],
        Category::Audio,
    ),
    (
        &[
            ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".md", ".rtf",
            ".odt", ".ods", ".odp", ".csv", ".pages", ".numbers", ".key", ".wps", ".epub",
        ],
        Category::Document,
    ),
    (
        &[".zip", ".rar", ".7z", ".tar", ".gz", ".bz2", ".xz", ".tgz", ".iso"],
        Category::Archive,
    ),
    (
        &[
            ".rs", ".py", ".js", ".ts", ".tsx", ".jsx", ".go", ".java", ".c", ".h", ".cpp",
            ".hpp", ".cs", ".rb", ".php", ".swift", ".kt", ".sh", ".html", ".css", ".json",
            ".yaml", ".yml", ".toml", ".xml", ".sql", ".vue",
        ],
        Category::Code,
    ),
    (
        &[
            ".exe", ".msi", ".dmg", ".pkg", ".app", ".deb", ".rpm", ".apk", ".appimage", ".bat",
            ".cmd",
        ],
        Category::Program,
    ),
    (&[".bak", ".old", ".backup"], Category::Backup),
    (&[".torrent"], Category::Download),
];

/// ASCII keywords must be a whole word of the folder name ("2023 Backup" but
/// not "barcode"). CJK names have no separators, so those match anywhere.
fn folder_name_matches(lower: &str, keyword: &str) -> bool {
    if !keyword.is_ascii() {
        return lower.contains(keyword);
    }
    lower
        .split(|c: char| c.is_whitespace() || matches!(c, '_' | '-' | '.'))
        .any(|token| token == keyword)
}

/// Classify an entry by its name and type flags. Pure and total.
pub fn classify(name: &str, is_directory: bool, is_symlink: bool) -> Category {
    if is_symlink {
        return Category::Shortcut;
    }

    let lower = name.to_lowercase();

    if is_directory {
        if PROJECT_MARKERS.contains(&lower.as_str()) {
            return Category::Code;
        }
        return FOLDER_KEYWORDS
            .iter()
            .find(|(keyword, _)| folder_name_matches(&lower, keyword))
            .map(|(_, category)| *category)
            .unwrap_or(Category::Folder);
    }

    let extension = extension_of(&lower);
    if SHORTCUT_EXTENSIONS.contains(&extension.as_str()) {
        return Category::Shortcut;
    }

    let stem = match lower.rfind('.') {
        Some(idx) if !extension.is_empty() => &lower[..idx],
        _ => lower.as_str(),
    };
    if let Some((_, category)) = NAME_KEYWORDS.iter().find(|(keyword, _)| stem.contains(keyword)) {
        return *category;
    }

    if is_image_extension(&extension) && SCREENSHOT_TOKENS.iter().any(|t| stem.contains(t)) {
        return Category::Screenshot;
    }

    category_for_extension(&extension).unwrap_or(Category::Other)
}

/// Look up a lower-cased, dotted extension in the extension table
pub fn category_for_extension(extension: &str) -> Option<Category> {
    EXTENSION_TABLE
        .iter()
        .find(|(extensions, _)| extensions.contains(&extension))
        .map(|(_, category)| *category)
}

pub fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension)
}
