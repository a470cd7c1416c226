//! Python interpreter discovery.

use crate::error::{ProvisioningError, Result};
use crate::process::ToolCommand;
use regex::Regex;
use semver::{Version, VersionReq};
use std::path::PathBuf;
use std::sync::LazyLock;

const VERSION_PROBE: &str = "import sys; print('%d.%d.%d' % sys.version_info[:3])";

static PYTHON_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<major>\d+)\.(?P<minor>\d+)(?:\.(?P<patch>\d+))?")
        .expect("Python version regex is valid")
});

/// An interpreter found on this host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Resolved executable path
    pub path: PathBuf,
    /// Reported version
    pub version: Version,
}

/// Parse `Python 3.11.4`, `3.12.0rc1`, or `3.9` into a semver version
pub fn parse_python_version(output: &str) -> Option<Version> {
    let caps = PYTHON_VERSION_RE.captures(output)?;
    let major = caps["major"].parse().ok()?;
    let minor = caps["minor"].parse().ok()?;
    let patch = match caps.name("patch") {
        Some(patch) => patch.as_str().parse().ok()?,
        None => 0,
    };
    Some(Version::new(major, minor, patch))
}

/// First interpreter from `candidates` whose version satisfies `requirement`
pub(super) async fn find_matching(
    candidates: &[String],
    requirement: &VersionReq,
    requirement_text: &str,
) -> Result<Interpreter> {
    let mut probed = Vec::new();

    for candidate in candidates {
        let path = match which::which(candidate) {
            Ok(path) => path,
            Err(e) => {
                log::debug!("interpreter {candidate} not found: {e}");
                probed.push(format!("{candidate} (not found)"));
                continue;
            }
        };

        let Some(version) = probe_version(&path).await else {
            probed.push(format!("{} (unknown version)", path.display()));
            continue;
        };

        if requirement.matches(&version) {
            return Ok(Interpreter { path, version });
        }
        log::debug!("{} is {version}, does not satisfy {requirement}", path.display());
        probed.push(format!("{} ({version})", path.display()));
    }

    Err(ProvisioningError::NoMatchingInterpreter {
        requirement: requirement_text.to_string(),
        found: if probed.is_empty() {
            "none".to_string()
        } else {
            probed.join(", ")
        },
    }
    .into())
}

async fn probe_version(path: &std::path::Path) -> Option<Version> {
    let output = ToolCommand::new(path.as_os_str())
        .args(["-c", VERSION_PROBE])
        .run()
        .await
        .ok()?;
    if !output.success {
        return None;
    }
    parse_python_version(&output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_banners() {
        assert_eq!(parse_python_version("Python 3.11.4\n"), Some(Version::new(3, 11, 4)));
        assert_eq!(parse_python_version("3.12.0rc1"), Some(Version::new(3, 12, 0)));
        assert_eq!(parse_python_version("3.9"), Some(Version::new(3, 9, 0)));
        assert_eq!(parse_python_version("no version here"), None);
    }

    #[test]
    fn requirement_matching() {
        let at_least_38 = VersionReq::parse(">=3.8").unwrap();
        assert!(at_least_38.matches(&Version::new(3, 11, 4)));
        assert!(!at_least_38.matches(&Version::new(3, 7, 17)));

        let any_three = VersionReq::parse("3.*").unwrap();
        assert!(any_three.matches(&Version::new(3, 6, 0)));
        assert!(!any_three.matches(&Version::new(2, 7, 18)));
    }
}
