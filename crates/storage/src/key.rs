//! Log Keys

use std::fmt;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// Validated (team, severity) pair.
///
/// Both parts are used verbatim as path segments, so anything that could
/// leave the storage root is refused instead of rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogKey {
    team: String,
    severity: String,
}

impl LogKey {
    pub fn new(team: &str, severity: &str) -> Result<Self, StoreError> {
        check_segment("team", team)?;
        check_segment("severity", severity)?;
        Ok(Self {
            team: team.to_string(),
            severity: severity.to_string(),
        })
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn severity(&self) -> &str {
        &self.severity
    }

    /// `<root>/<team>`
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(&self.team)
    }

    /// `<root>/<team>/<severity>.json`
    pub fn file(&self, root: &Path) -> PathBuf {
        self.dir(root)
            .join(format!("{}.{}", self.severity, crate::LOG_EXTENSION))
    }
}

impl fmt::Display for LogKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.team, self.severity)
    }
}

fn check_segment(field: &str, value: &str) -> Result<(), StoreError> {
    let reason = if value.is_empty() {
        Some("is empty")
    } else if value == "." || value.contains("..") {
        Some("is a relative path component")
    } else if value.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if value.chars().any(char::is_control) {
        Some("contains a control character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::IoFailure(format!(
            "rejected {field} {value:?}: {reason}"
        ))),
        None => Ok(()),
    }
}
