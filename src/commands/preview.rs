// ABOUTME: Preview command implementation.
// ABOUTME: Lists what cleanup would remove from a local directory without touching it.

use std::path::Path;

use pagepush::cleanup::{Cleaner, CleanupRequest};
use pagepush::config::Config;
use pagepush::error::Result;
use pagepush::output::Output;

pub fn preview(config: &Config, dir: &Path, extra: Vec<String>, output: &Output) -> Result<()> {
    let mut patterns = config.cleanup.patterns.clone();
    patterns.extend(extra);

    let cleaner = config.cleaner();
    cleaner.validate(dir, &patterns)?;
    let removals = cleaner.preview(CleanupRequest::new(dir, &patterns))?;

    if removals.is_empty() {
        output.success("nothing to remove");
        return Ok(());
    }

    output.list("preview", &removals);
    output.success(&format!("{} path(s) would be removed", removals.len()));
    Ok(())
}
