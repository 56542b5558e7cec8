//! Package requirements: `name` (latest) or `name==version` (pinned).
//!
//! Only the two forms the provisioner installs are accepted. Range operators
//! (`>=`, `~=`, ...) are rejected so that a pinned requirement always means one
//! exact version.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::config::DEFAULT_PACKAGES;

/// One package to install into the environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    /// Exact version when pinned; `None` installs the latest available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Errors returned by requirement parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequirementError {
    #[error("Empty requirement")]
    Empty,

    #[error("Invalid package name '{0}'")]
    InvalidName(String),

    #[error("Requirement '{0}' has no version after '=='")]
    EmptyVersion(String),

    #[error("Unsupported version specifier in '{0}' (use 'name' or 'name==version')")]
    UnsupportedSpecifier(String),

    #[error("Package '{0}' is listed more than once")]
    Duplicate(String),

    #[error("No packages to install")]
    NoPackages,
}

static NAME_RE: OnceLock<Regex> = OnceLock::new();
static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("package name regex")
    })
}

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+!_-]*$").expect("version regex")
    })
}

impl Requirement {
    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    pub fn unpinned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }

    /// Canonical name: lowercase, runs of `-`, `_`, `.` collapsed to `-`.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether an installed `(name, version)` satisfies this requirement.
    pub fn is_satisfied_by(&self, name: &str, version: &str) -> bool {
        if normalize_name(name) != self.normalized_name() {
            return false;
        }
        match self.version {
            Some(ref wanted) => wanted == version,
            None => true,
        }
    }
}

/// Canonical form of a distribution name, used for comparisons.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !last_sep {
                out.push('-');
            }
            last_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_sep = false;
        }
    }
    out
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let line = raw.split('#').next().unwrap_or(raw).trim();
        if line.is_empty() {
            return Err(RequirementError::Empty);
        }

        let (name, version) = match line.split_once("==") {
            Some((name, version)) => {
                let version = version.trim();
                if version.is_empty() {
                    return Err(RequirementError::EmptyVersion(line.to_string()));
                }
                if !version_re().is_match(version) {
                    return Err(RequirementError::UnsupportedSpecifier(line.to_string()));
                }
                (name.trim(), Some(version.to_string()))
            }
            None => (line, None),
        };

        if name.contains(|c: char| matches!(c, '<' | '>' | '~' | '!' | '=' | ',' | ';' | '[')) {
            return Err(RequirementError::UnsupportedSpecifier(line.to_string()));
        }
        if !name_re().is_match(name) {
            return Err(RequirementError::InvalidName(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            version,
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(ref v) => write!(f, "{}=={}", self.name, v),
            None => f.write_str(&self.name),
        }
    }
}

/// Parse a list of requirement strings, rejecting duplicates and an empty set.
pub fn parse_requirements<I, S>(items: I) -> Result<Vec<Requirement>, RequirementError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut reqs: Vec<Requirement> = Vec::new();
    for item in items {
        let req: Requirement = item.as_ref().parse()?;
        if reqs
            .iter()
            .any(|r| r.normalized_name() == req.normalized_name())
        {
            return Err(RequirementError::Duplicate(req.name));
        }
        reqs.push(req);
    }
    if reqs.is_empty() {
        return Err(RequirementError::NoPackages);
    }
    Ok(reqs)
}

/// The redactor's dependencies: the pinned PDF library and the image library.
pub fn default_requirements() -> Vec<Requirement> {
    parse_requirements(DEFAULT_PACKAGES).expect("default packages are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pinned_and_unpinned() {
        let pinned: Requirement = "PyMuPDF==1.24.14".parse().unwrap();
        assert_eq!(pinned, Requirement::pinned("PyMuPDF", "1.24.14"));
        assert!(pinned.is_pinned());

        let latest: Requirement = "  Pillow  # image library".parse().unwrap();
        assert_eq!(latest, Requirement::unpinned("Pillow"));
        assert!(!latest.is_pinned());
    }

    #[test]
    fn test_parse_rejects_ranges_and_bad_names() {
        assert_eq!(
            "requests>=2.0".parse::<Requirement>(),
            Err(RequirementError::UnsupportedSpecifier("requests>=2.0".into()))
        );
        assert_eq!(
            "flask~=2.0".parse::<Requirement>(),
            Err(RequirementError::UnsupportedSpecifier("flask~=2.0".into()))
        );
        assert_eq!(
            "numpy==".parse::<Requirement>(),
            Err(RequirementError::EmptyVersion("numpy==".into()))
        );
        assert_eq!(
            "-rfile.txt".parse::<Requirement>(),
            Err(RequirementError::InvalidName("-rfile.txt".into()))
        );
        assert_eq!("   ".parse::<Requirement>(), Err(RequirementError::Empty));
    }

    #[test]
    fn test_display_round_trips_the_install_argument() {
        assert_eq!(
            Requirement::pinned("PyMuPDF", "1.24.14").to_string(),
            "PyMuPDF==1.24.14"
        );
        assert_eq!(Requirement::unpinned("Pillow").to_string(), "Pillow");
    }

    #[test]
    fn test_normalized_name() {
        assert_eq!(normalize_name("PyMuPDF"), "pymupdf");
        assert_eq!(normalize_name("zope.interface"), "zope-interface");
        assert_eq!(normalize_name("Foo__Bar-.baz"), "foo-bar-baz");
    }

    #[test]
    fn test_is_satisfied_by() {
        let pinned = Requirement::pinned("PyMuPDF", "1.24.14");
        assert!(pinned.is_satisfied_by("pymupdf", "1.24.14"));
        assert!(!pinned.is_satisfied_by("PyMuPDF", "1.24.13"));
        assert!(!pinned.is_satisfied_by("Pillow", "1.24.14"));

        let latest = Requirement::unpinned("Pillow");
        assert!(latest.is_satisfied_by("pillow", "10.4.0"));
    }

    #[test]
    fn test_parse_requirements_rejects_duplicates_and_empty() {
        assert_eq!(
            parse_requirements(["Pillow", "pillow==10.0.0"]),
            Err(RequirementError::Duplicate("pillow".into()))
        );
        assert_eq!(
            parse_requirements(Vec::<String>::new()),
            Err(RequirementError::NoPackages)
        );
    }

    #[test]
    fn test_default_requirements() {
        let reqs = default_requirements();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs.iter().filter(|r| r.is_pinned()).count(), 1);
        assert_eq!(reqs[0].name, "PyMuPDF");
        assert_eq!(reqs[1].name, "Pillow");
    }
}
