//! Where a repository's history lives in the hoard.

use serde::Serialize;

use crate::codec::Format;
use crate::forge::RepoSlug;

/// File name stem of every history file.
pub const FILE_STEM: &str = "insights";

/// Location of one repository's history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitTarget {
    /// Repository holding the history files.
    pub hoard: RepoSlug,
    /// Branch the files are committed to.
    pub branch: String,
    /// Path of the file inside the hoard.
    pub path: String,
}

impl CommitTarget {
    /// Target for `source`'s history under `directory`.
    pub fn new(
        hoard: RepoSlug,
        branch: impl Into<String>,
        directory: &str,
        source: &RepoSlug,
        format: Format,
    ) -> Self {
        Self {
            hoard,
            branch: branch.into(),
            path: insights_path(directory, source, format),
        }
    }
}

/// `<directory>/<owner>/<repo>/insights.<ext>`, normalized like a path join:
/// empty and `.` segments vanish and no leading or trailing slash remains.
pub fn insights_path(directory: &str, source: &RepoSlug, format: Format) -> String {
    let file = format!("{FILE_STEM}.{}", format.extension());
    directory
        .split('/')
        .chain([source.owner.as_str(), source.name.as_str(), file.as_str()])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Commit message for an update of `source`'s history.
pub fn commit_message(source: &RepoSlug) -> String {
    format!("Update insights file for {source}")
}
