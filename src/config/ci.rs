// ABOUTME: CI event context read from the GitHub Actions environment.
// ABOUTME: Supplies repository, event, branch, PR number, and commit for a publish.

/// What the CI run says about the change being published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub repository: Option<String>,
    pub event_name: String,
    pub branch: String,
    pub pr_number: Option<String>,
    pub sha: String,
}

impl CiContext {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let branch = var("GITHUB_HEAD_REF")
            .or_else(|| var("GITHUB_REF_NAME"))
            .unwrap_or_default();
        let pr_number = var("GITHUB_REF").and_then(|r| pr_from_ref(&r));

        Self {
            repository: var("GITHUB_REPOSITORY"),
            event_name: var("GITHUB_EVENT_NAME").unwrap_or_default(),
            branch,
            pr_number,
            sha: var("GITHUB_SHA").unwrap_or_default(),
        }
    }
}

/// `refs/pull/<n>/merge` (or `/head`) to `<n>`.
fn pr_from_ref(git_ref: &str) -> Option<String> {
    let rest = git_ref.strip_prefix("refs/pull/")?;
    let (number, _) = rest.split_once('/')?;
    (!number.is_empty() && number.chars().all(|c| c.is_ascii_digit()))
        .then(|| number.to_string())
}
