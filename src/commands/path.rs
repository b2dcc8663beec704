// ABOUTME: Path command implementation.
// ABOUTME: Prints where a CI context would deploy, using config main branches.

use pagepush::config::{CiContext, Config};
use pagepush::deploy::{PathResolver, deployment_url};
use pagepush::error::Result;
use pagepush::output::Output;
use serde::Serialize;

#[derive(Serialize)]
struct Resolved<'a> {
    path: String,
    kind: pagepush::types::PathType,
    url: Option<String>,
    branch: &'a str,
    event: &'a str,
}

pub fn path(
    config: &Config,
    event: Option<String>,
    branch: Option<String>,
    pr: Option<String>,
    output: &Output,
) -> Result<()> {
    let ci = CiContext::from_env();
    let event = event.unwrap_or(ci.event_name);
    let branch = branch.unwrap_or(ci.branch);
    let pr = pr.or(ci.pr_number);

    let target = config
        .main_branches()
        .resolve(&event, &branch, pr.as_deref());

    // The URL needs a repository; without one only the path is reported.
    let url = config
        .repository_or(ci.repository.as_deref())
        .ok()
        .map(|repo| deployment_url(&config.base_url(&repo), &target));

    output.record(
        "path",
        &Resolved {
            path: target.to_string(),
            kind: target.kind(),
            url: url.clone(),
            branch: &branch,
            event: &event,
        },
    );

    let rendered = if target.is_root() {
        "/".to_string()
    } else {
        target.to_string()
    };
    output.success(&rendered);
    if let Some(url) = url {
        output.progress(&url);
    }
    Ok(())
}
