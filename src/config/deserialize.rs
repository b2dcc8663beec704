// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles repository slugs and main-branch lists.

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::deploy::MainBranches;
use crate::types::RepoSlug;

pub fn deserialize_repository<'de, D>(deserializer: D) -> Result<Option<RepoSlug>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| RepoSlug::new(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// Accepts either a YAML list or a comma-separated string.
pub fn deserialize_main_branches<'de, D>(deserializer: D) -> Result<NonEmpty<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entry = BranchList::deserialize(deserializer)?;
    let joined = match entry {
        BranchList::Csv(s) => s,
        BranchList::List(items) => items.join(","),
    };
    MainBranches::parse(&joined)
        .map(MainBranches::into_inner)
        .ok_or_else(|| serde::de::Error::custom("main_branches must name at least one branch"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BranchList {
    Csv(String),
    List(Vec<String>),
}
