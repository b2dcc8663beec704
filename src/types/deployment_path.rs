// ABOUTME: Canonical target subdirectory for a deployment on the pages branch.
// ABOUTME: Renders as root, main/<id>, branch/<id>, or pr/<id>.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    Root,
    Main,
    Branch,
    Pr,
}

impl PathType {
    /// Directory segment under which deployments of this kind live.
    pub fn root_segment(&self) -> &'static str {
        match self {
            PathType::Root => "",
            PathType::Main => "main",
            PathType::Branch => "branch",
            PathType::Pr => "pr",
        }
    }
}

/// Where on the pages branch an artifact set is published.
///
/// `Root` has an empty segment and identifier; every other kind has both.
/// Construct through the named constructors so the invariant holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentPath {
    kind: PathType,
    identifier: String,
}

impl DeploymentPath {
    pub fn root() -> Self {
        Self {
            kind: PathType::Root,
            identifier: String::new(),
        }
    }

    pub fn main(branch: &str) -> Self {
        Self::segment(PathType::Main, branch)
    }

    pub fn branch(branch: &str) -> Self {
        Self::segment(PathType::Branch, branch)
    }

    pub fn pr(number: &str) -> Self {
        Self::segment(PathType::Pr, number)
    }

    fn segment(kind: PathType, identifier: &str) -> Self {
        let identifier = safe_segment(identifier);
        if identifier.is_empty() {
            return Self::root();
        }
        Self { kind, identifier }
    }

    pub fn kind(&self) -> PathType {
        self.kind
    }

    pub fn root_segment(&self) -> &'static str {
        self.kind.root_segment()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_root(&self) -> bool {
        self.kind == PathType::Root
    }
}

impl fmt::Display for DeploymentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            Ok(())
        } else {
            write!(f, "{}/{}", self.root_segment(), self.identifier)
        }
    }
}

impl std::str::FromStr for DeploymentPath {
    type Err = String;

    /// Parse the rendered form back: empty or `/` is root, otherwise
    /// `<main|branch|pr>/<identifier>`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().trim_matches('/');
        if value.is_empty() {
            return Ok(Self::root());
        }
        let (segment, identifier) = value
            .split_once('/')
            .ok_or_else(|| format!("expected <main|branch|pr>/<name>, got '{value}'"))?;
        let path = match segment {
            "main" => Self::main(identifier),
            "branch" => Self::branch(identifier),
            "pr" => Self::pr(identifier),
            other => return Err(format!("unknown deployment kind '{other}'")),
        };
        if path.is_root() {
            return Err(format!("missing name after '{segment}/'"));
        }
        Ok(path)
    }
}

/// Replace every character outside `[A-Za-z0-9_.-]` with `-`.
///
/// One output character per input character, so the length in chars is
/// preserved.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Sanitize and make sure the segment cannot climb out of its parent.
fn safe_segment(value: &str) -> String {
    let sanitized = sanitize(value);
    if !sanitized.is_empty() && sanitized.chars().all(|c| c == '.') {
        "-".repeat(sanitized.len())
    } else {
        sanitized
    }
}
