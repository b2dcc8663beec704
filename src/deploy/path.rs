// ABOUTME: Maps CI event context to the deployment subdirectory on the pages branch.
// ABOUTME: Pure resolution; the main-branch list is passed in, never read from the environment.

use nonempty::NonEmpty;

use crate::types::DeploymentPath;

/// Events whose PR number identifies the deployment.
const PR_EVENTS: &[&str] = &["pull_request", "pull_request_target"];

/// Branch names that deploy under `main/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainBranches(NonEmpty<String>);

impl Default for MainBranches {
    fn default() -> Self {
        Self(NonEmpty::from((
            "main".to_string(),
            vec!["master".to_string()],
        )))
    }
}

impl From<NonEmpty<String>> for MainBranches {
    fn from(names: NonEmpty<String>) -> Self {
        Self(names)
    }
}

impl MainBranches {
    /// Parse a comma-separated list. Blank entries are ignored; an all-blank
    /// list yields `None`.
    pub fn parse(list: &str) -> Option<Self> {
        let names: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        NonEmpty::from_vec(names).map(Self)
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.0.iter().any(|name| name == branch)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_inner(self) -> NonEmpty<String> {
        self.0
    }
}

/// Decides where a deployment lands.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, event: &str, branch: &str, pr_number: Option<&str>) -> DeploymentPath;
}

impl PathResolver for MainBranches {
    fn resolve(&self, event: &str, branch: &str, pr_number: Option<&str>) -> DeploymentPath {
        build_deployment_path(event, branch, pr_number, self)
    }
}

/// Resolve the deployment path for one CI event.
///
/// Merge refs and PR events go under `pr/`, main branches under `main/`,
/// everything else under `branch/` with a sanitized name. No context at all
/// resolves to the root.
pub fn build_deployment_path(
    event: &str,
    branch: &str,
    pr_number: Option<&str>,
    main_branches: &MainBranches,
) -> DeploymentPath {
    let branch = branch.trim();
    let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
    let pr_number = pr_number.map(str::trim).filter(|n| !n.is_empty());

    if let Some(merge_number) = merge_ref_number(branch) {
        return DeploymentPath::pr(pr_number.unwrap_or(merge_number));
    }

    if let Some(number) = pr_number
        && (PR_EVENTS.contains(&event.trim()) || branch.is_empty())
    {
        return DeploymentPath::pr(number);
    }

    if branch.is_empty() {
        return DeploymentPath::root();
    }

    if main_branches.contains(branch) {
        DeploymentPath::main(branch)
    } else {
        DeploymentPath::branch(branch)
    }
}

/// `42` for `42/merge`, `refs/pull/42/merge` or `pull/42/merge`.
fn merge_ref_number(branch: &str) -> Option<&str> {
    let head = branch.strip_suffix("/merge")?;
    let number = head.rsplit('/').next().unwrap_or(head);
    (!number.is_empty()).then_some(number)
}
