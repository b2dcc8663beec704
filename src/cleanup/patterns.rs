// ABOUTME: Pattern matching and the built-in protected and disposable sets.
// ABOUTME: Protected names and extensions always win over removal patterns.

/// File names that are never removed.
pub const PROTECTED_NAMES: &[&str] = &[
    ".nojekyll",
    "CNAME",
    "index.html",
    "favicon.ico",
    "site.webmanifest",
];

/// Extensions of published artifacts that are never removed.
pub const PROTECTED_EXTENSIONS: &[&str] = &[
    "html",
    "htm",
    "svg",
    "css",
    "js",
    "json",
    "png",
    "jpg",
    "jpeg",
    "gif",
    "webp",
    "ico",
    "webmanifest",
];

/// Removal patterns that are rejected outright before any cleanup runs.
pub const CRITICAL_PATTERNS: &[&str] = &[
    "index.html",
    "*.html",
    "*.htm",
    "*.svg",
    "*.json",
    "*.css",
    "*.js",
    "*",
    "**",
    "**/*",
];

/// Extensions that are clearly not published artifacts.
pub const DISPOSABLE_EXTENSIONS: &[&str] = &[
    "go", "rs", "py", "rb", "java", "c", "h", "ts", "mod", "sum", "lock", "yml", "yaml", "md",
    "txt", "log",
];

/// Directory names that are clearly not published artifacts.
pub const DISPOSABLE_DIRS: &[&str] = &[
    "src",
    "cmd",
    "internal",
    "pkg",
    "vendor",
    "node_modules",
    "docs",
    "build",
    "scripts",
    "tools",
    "target",
    ".github",
];

/// Preserve patterns applied when the caller configures none.
pub fn default_preserve_patterns() -> Vec<String> {
    let mut patterns: Vec<String> = PROTECTED_NAMES.iter().map(|s| s.to_string()).collect();
    patterns.extend(PROTECTED_EXTENSIONS.iter().map(|ext| format!("*.{ext}")));
    patterns
}

/// Removal patterns applied when the caller configures none.
pub fn default_cleanup_patterns() -> Vec<String> {
    [
        "*.go",
        "*.mod",
        "*.sum",
        "*.lock",
        "*.yml",
        "*.yaml",
        "*.md",
        "*.txt",
        "*.log",
        "*.out",
        "coverage.out",
        "vendor/*",
        "node_modules/*",
        ".github/*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Whether `path` (relative, `/`-separated) matches `pattern`.
///
/// Wildcard patterns are suffix (`*.ext`), directory-prefix (`dir/*`), or
/// substring with the wildcards stripped. Plain patterns match exactly or as
/// a directory prefix.
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return false;
    }

    if pattern.contains('*') {
        if let Some(suffix) = pattern.strip_prefix('*')
            && suffix.starts_with('.')
            && !suffix.contains('*')
        {
            return path.ends_with(suffix);
        }
        if let Some(dir) = pattern.strip_suffix("/*")
            && !dir.contains('*')
        {
            return path.starts_with(&format!("{dir}/"));
        }
        return path.contains(&pattern.replace('*', ""));
    }

    path == pattern || path.starts_with(&format!("{pattern}/"))
}

/// Whether a removal pattern is on the critical list.
pub fn is_critical_pattern(pattern: &str) -> bool {
    let pattern = pattern.trim();
    PROTECTED_NAMES.contains(&pattern) || CRITICAL_PATTERNS.contains(&pattern)
}

/// Whether a file name belongs to the built-in protected set.
pub fn is_protected_name(name: &str) -> bool {
    PROTECTED_NAMES.contains(&name)
        || extension(name).is_some_and(|ext| PROTECTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether a file name carries a clearly-not-an-artifact extension.
pub fn is_disposable_file(name: &str) -> bool {
    extension(name).is_some_and(|ext| DISPOSABLE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether a directory name is a clearly-not-an-artifact directory.
pub fn is_disposable_dir(name: &str) -> bool {
    DISPOSABLE_DIRS.contains(&name)
}

fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
