// ABOUTME: Deterministic directory walk deciding what to remove and what to keep.
// ABOUTME: Protection always wins; directories holding protected files are descended, not removed.

use std::fs;
use std::path::{Path, PathBuf};

use super::patterns::{is_disposable_dir, is_disposable_file, is_protected_name, matches_pattern};
use super::{
    Cleaner, CleanupError, CleanupRequest, CleanupResult, PathError, default_preserve_patterns,
    validate_patterns,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Keep,
    Remove,
}

#[derive(Debug)]
struct Entry {
    rel: String,
    abs: PathBuf,
    is_dir: bool,
}

#[derive(Debug, Default)]
struct Plan {
    remove: Vec<Entry>,
    keep: Vec<Entry>,
    errors: Vec<PathError>,
}

/// Filesystem cleaner with a configurable preserve list.
#[derive(Debug, Clone)]
pub struct CleanupEngine {
    preserve: Vec<String>,
}

impl Default for CleanupEngine {
    fn default() -> Self {
        Self::new(default_preserve_patterns())
    }
}

impl CleanupEngine {
    pub fn new(preserve: Vec<String>) -> Self {
        Self { preserve }
    }

    pub fn preserve_patterns(&self) -> &[String] {
        &self.preserve
    }

    fn is_protected(&self, rel: &str, name: &str, is_dir: bool, req: &CleanupRequest<'_>) -> bool {
        if !is_dir && is_protected_name(name) {
            return true;
        }
        self.preserve
            .iter()
            .chain(req.protect.iter())
            .any(|p| matches_pattern(rel, p))
    }

    fn decide(&self, rel: &str, name: &str, is_dir: bool, req: &CleanupRequest<'_>) -> Decision {
        if self.is_protected(rel, name, is_dir, req) {
            return Decision::Keep;
        }
        if req.patterns.iter().any(|p| matches_pattern(rel, p)) {
            return Decision::Remove;
        }
        if is_dir && is_disposable_dir(name) {
            return Decision::Remove;
        }
        if !is_dir && is_disposable_file(name) {
            return Decision::Remove;
        }
        Decision::Keep
    }

    fn plan(&self, req: &CleanupRequest<'_>) -> Result<Plan, CleanupError> {
        if !req.dir.is_dir() {
            return Err(CleanupError::WorkDirMissing(req.dir.to_path_buf()));
        }
        let mut plan = Plan::default();
        let entries = read_sorted(req.dir).map_err(|source| CleanupError::Io {
            path: req.dir.to_path_buf(),
            source,
        })?;
        self.walk(entries, "", req, &mut plan);
        Ok(plan)
    }

    fn walk(&self, entries: Vec<fs::DirEntry>, prefix: &str, req: &CleanupRequest<'_>, plan: &mut Plan) {
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = join(prefix, &name);
            let is_dir = match entry.file_type() {
                Ok(ft) => ft.is_dir(),
                Err(e) => {
                    plan.errors.push(PathError {
                        path: rel,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            if is_dir && name == ".git" {
                continue;
            }

            let abs = entry.path();
            let decision = match self.decide(&rel, &name, is_dir, req) {
                Decision::Remove if is_dir && self.holds_protected(&abs, &rel, req) => {
                    tracing::debug!("keeping {} because it contains protected files", rel);
                    Decision::Keep
                }
                other => other,
            };

            match decision {
                Decision::Remove => plan.remove.push(Entry { rel, abs, is_dir }),
                Decision::Keep if is_dir => {
                    match read_sorted(&abs) {
                        Ok(children) => self.walk(children, &rel, req, plan),
                        Err(e) => plan.errors.push(PathError {
                            path: rel.clone(),
                            message: e.to_string(),
                        }),
                    }
                    plan.keep.push(Entry { rel, abs, is_dir });
                }
                Decision::Keep => plan.keep.push(Entry { rel, abs, is_dir }),
            }
        }
    }

    /// Whether anything beneath `dir` is protected. Unreadable subtrees count as protected.
    fn holds_protected(&self, dir: &Path, prefix: &str, req: &CleanupRequest<'_>) -> bool {
        let Ok(entries) = read_sorted(dir) else {
            return true;
        };
        entries.into_iter().any(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = join(prefix, &name);
            match entry.file_type() {
                Ok(ft) if ft.is_dir() => {
                    name != ".git"
                        && (self.is_protected(&rel, &name, true, req)
                            || self.holds_protected(&entry.path(), &rel, req))
                }
                Ok(_) => self.is_protected(&rel, &name, false, req),
                Err(_) => true,
            }
        })
    }
}

impl Cleaner for CleanupEngine {
    fn validate(&self, dir: &Path, patterns: &[String]) -> Result<(), CleanupError> {
        validate_patterns(patterns)?;
        if !dir.is_dir() {
            return Err(CleanupError::WorkDirMissing(dir.to_path_buf()));
        }
        Ok(())
    }

    fn preview(&self, request: CleanupRequest<'_>) -> Result<Vec<String>, CleanupError> {
        validate_patterns(request.patterns)?;
        let plan = self.plan(&request)?;
        Ok(plan.remove.into_iter().map(|e| e.rel).collect())
    }

    fn cleanup(
        &self,
        request: CleanupRequest<'_>,
        dry_run: bool,
    ) -> Result<CleanupResult, CleanupError> {
        self.validate(request.dir, request.patterns)?;
        let plan = self.plan(&request)?;

        let mut result = CleanupResult {
            dry_run,
            errors: plan.errors,
            ..Default::default()
        };

        for entry in plan.keep {
            if entry.is_dir {
                result.dirs_preserved += 1;
            } else {
                result.files_preserved += 1;
            }
            result.preserved.push(entry.rel);
        }
        result.preserved.sort();

        for entry in plan.remove {
            if !dry_run {
                let removed = if entry.is_dir {
                    fs::remove_dir_all(&entry.abs)
                } else {
                    fs::remove_file(&entry.abs)
                };
                if let Err(e) = removed {
                    tracing::warn!("failed to remove {}: {}", entry.rel, e);
                    result.errors.push(PathError {
                        path: entry.rel,
                        message: e.to_string(),
                    });
                    continue;
                }
                tracing::debug!("removed {}", entry.rel);
            }
            if entry.is_dir {
                result.dirs_removed += 1;
            } else {
                result.files_removed += 1;
            }
            result.removed.push(entry.rel);
        }

        Ok(result)
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

fn read_sorted(dir: &Path) -> std::io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}
