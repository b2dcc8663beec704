// ABOUTME: Init command implementation.
// ABOUTME: Writes a commented pagepush.yml into the current directory.

use std::path::Path;

use pagepush::config::init_config;
use pagepush::error::Result;
use pagepush::output::Output;

pub fn init(dir: &Path, repository: Option<&str>, force: bool, output: &Output) -> Result<()> {
    let path = init_config(dir, repository, force)?;
    output.success(&format!("Created {}", path.display()));
    Ok(())
}
