// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented pagepush.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::RepoSlug;

use super::CONFIG_FILENAME;

/// Write a template config into `dir`, returning its path.
pub fn init_config(dir: &Path, repository: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let repository = repository
        .map(RepoSlug::new)
        .transpose()
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    std::fs::write(&config_path, generate_template_yaml(repository.as_ref()))?;
    Ok(config_path)
}

fn generate_template_yaml(repository: Option<&RepoSlug>) -> String {
    let repository = match repository {
        Some(repo) => format!("repository: {repo}"),
        None => "# repository: owner/name   # defaults to GITHUB_REPOSITORY".to_string(),
    };
    format!(
        r#"{repository}
branch: gh-pages

# Push credentials; PAGEPUSH_TOKEN overrides this at load time.
token:
  env: GITHUB_TOKEN

# Branches deployed under main/ (PAGEPUSH_MAIN_BRANCHES overrides).
main_branches: [main, master]

# base_url: https://docs.example.com
# remote: https://github.com/owner/name.git

# cleanup:
#   # Replaces the default list of paths that must never be removed.
#   preserve: [CNAME, .nojekyll]

lock:
  timeout: 5m
  strategy: exclusive
  stale_after: 1h

push:
  attempts: 3
  backoff: 1s

# Poll the published URL after pushing.
# verify:
#   timeout: 2m

rollback: lease
"#
    )
}
