// ABOUTME: Command module aggregator for the pagepush CLI.
// ABOUTME: Re-exports the init, deploy, rollback, preview, and path handlers.

mod deploy;
mod init;
mod path;
mod preview;
mod rollback;
mod workspace;

pub use deploy::{DeployArgs, deploy};
pub use init::init;
pub use path::path;
pub use preview::preview;
pub use rollback::rollback;
