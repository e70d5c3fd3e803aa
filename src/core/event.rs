//! Webhook push events and branch filtering

use regex::Regex;
use serde::{Deserialize, Serialize};

const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Repository push notification, as delivered by the webhook
///
/// Unrecognized fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Pushed ref, e.g. `refs/heads/develop`
    #[serde(rename = "ref", default)]
    pub git_ref: String,

    pub repository: RepositoryInfo,
}

/// Repository section of a push event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub clone_url: Option<String>,
}

impl PushEvent {
    /// Parse a push event from its JSON payload
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Branch name, when the ref points at a branch
    pub fn branch(&self) -> Option<&str> {
        self.git_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .filter(|b| !b.is_empty())
    }
}

impl RepositoryInfo {
    /// URL to clone from, preferring `clone_url`
    pub fn clone_url(&self) -> Option<&str> {
        self.clone_url.as_deref().or(self.url.as_deref())
    }
}

/// Restricts which pushed branches trigger a run
///
/// Patterns are branch-name globs (`release-*`, `feature/*`) matched as a
/// prefix of the pushed ref under `refs/heads/`. An empty filter accepts every
/// branch.
#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    patterns: Vec<Regex>,
}

impl BranchFilter {
    /// A filter that accepts every branch
    pub fn all() -> Self {
        Self::default()
    }

    /// Compile a filter from branch globs
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&glob_to_ref_regex(p.as_ref())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether a push to `git_ref` should trigger a run
    pub fn matches(&self, git_ref: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(git_ref))
    }
}

fn glob_to_ref_regex(glob: &str) -> String {
    let mut pattern = format!("^{}", regex::escape(BRANCH_REF_PREFIX));
    for ch in glob.chars() {
        match ch {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    pattern
}
