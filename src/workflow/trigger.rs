//! Workflow triggers and the events matched against them

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::str::FromStr;

/// Release activity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseAction {
    Published,
    Unpublished,
    Created,
    Edited,
    Deleted,
    Prereleased,
    Released,
}

impl ReleaseAction {
    pub const ALL: [ReleaseAction; 7] = [
        ReleaseAction::Published,
        ReleaseAction::Unpublished,
        ReleaseAction::Created,
        ReleaseAction::Edited,
        ReleaseAction::Deleted,
        ReleaseAction::Prereleased,
        ReleaseAction::Released,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseAction::Published => "published",
            ReleaseAction::Unpublished => "unpublished",
            ReleaseAction::Created => "created",
            ReleaseAction::Edited => "edited",
            ReleaseAction::Deleted => "deleted",
            ReleaseAction::Prereleased => "prereleased",
            ReleaseAction::Released => "released",
        }
    }
}

impl FromStr for ReleaseAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ReleaseAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown release activity type '{}'", s))
    }
}

impl fmt::Display for ReleaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A repository event that may trigger the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum Event {
    /// Commits pushed to a branch
    Push { branch: String },
    /// Release activity
    Release { action: ReleaseAction },
}

impl Event {
    /// A push to `branch`
    pub fn push(branch: impl Into<String>) -> Self {
        Event::Push {
            branch: branch.into(),
        }
    }

    pub fn release(action: ReleaseAction) -> Self {
        Event::Release { action }
    }

    /// Build an event from its name and optional qualifier
    ///
    /// The qualifier is the branch for `push` (default `main`) and the
    /// activity type for `release` (default `created`).
    pub fn parse(name: &str, qualifier: Option<&str>) -> Result<Self> {
        match name {
            "push" => Ok(Event::push(qualifier.unwrap_or("main"))),
            "release" => Ok(Event::release(qualifier.unwrap_or("created").parse()?)),
            other => anyhow::bail!("Unsupported event '{}'", other),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Push { branch } => write!(f, "push to {}", branch),
            Event::Release { action } => write!(f, "release {}", action),
        }
    }
}

/// Ref and path filters for `push`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,

    #[serde(rename = "branches-ignore")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches_ignore: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(rename = "tags-ignore")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags_ignore: Vec<String>,

    /// Changed-file filters; not evaluated for local events
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,

    #[serde(rename = "paths-ignore")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths_ignore: Vec<String>,
}

impl PushFilter {
    /// Whether every push to every branch passes this filter
    pub fn is_unconditional(&self) -> bool {
        !self.filters_branches() && !self.filters_tags() && !self.filters_paths()
    }

    /// Whether a push to `branch` passes this filter
    ///
    /// A filter that names tags but no branches never matches a branch
    /// push. Path filters are assumed to match.
    pub fn matches(&self, branch: &str) -> bool {
        if self.filters_tags() && !self.filters_branches() {
            return false;
        }

        let included = self.branches.is_empty() || patterns_match(&self.branches, branch);
        included && !patterns_match(&self.branches_ignore, branch)
    }

    fn filters_branches(&self) -> bool {
        !self.branches.is_empty() || !self.branches_ignore.is_empty()
    }

    fn filters_tags(&self) -> bool {
        !self.tags.is_empty() || !self.tags_ignore.is_empty()
    }

    fn filters_paths(&self) -> bool {
        !self.paths.is_empty() || !self.paths_ignore.is_empty()
    }
}

/// Activity type filter for `release`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseFilter {
    /// Empty means every activity type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<ReleaseAction>,
}

impl ReleaseFilter {
    pub fn matches(&self, action: ReleaseAction) -> bool {
        self.types.is_empty() || self.types.contains(&action)
    }
}

/// The `on:` section of a workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Triggers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushFilter>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseFilter>,

    /// Events this crate doesn't model (kept for display)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<String>,
}

impl Triggers {
    /// Check whether `event` starts a workflow run
    pub fn matches(&self, event: &Event) -> bool {
        match event {
            Event::Push { branch } => self.push.as_ref().is_some_and(|f| f.matches(branch)),
            Event::Release { action } => self.release.as_ref().is_some_and(|f| f.matches(*action)),
        }
    }

    fn add_event(&mut self, name: &str, filter: Value) -> Result<()> {
        let filter = match filter {
            Value::Null => Value::Mapping(Default::default()),
            other => other,
        };
        match name {
            "push" => self.push = Some(serde_yaml::from_value(filter)?),
            "release" => self.release = Some(serde_yaml::from_value(filter)?),
            other => self.other.push(other.to_string()),
        }
        Ok(())
    }
}

impl TryFrom<Value> for Triggers {
    type Error = anyhow::Error;

    fn try_from(value: Value) -> Result<Self> {
        let mut triggers = Triggers::default();
        match value {
            Value::String(name) => triggers.add_event(&name, Value::Null)?,
            Value::Sequence(names) => {
                for name in names {
                    match name {
                        Value::String(name) => triggers.add_event(&name, Value::Null)?,
                        other => anyhow::bail!("Expected an event name, got {:?}", other),
                    }
                }
            }
            Value::Mapping(events) => {
                for (name, filter) in events {
                    match name {
                        Value::String(name) => triggers.add_event(&name, filter)?,
                        other => anyhow::bail!("Expected an event name, got {:?}", other),
                    }
                }
            }
            other => anyhow::bail!("Unsupported 'on' value: {:?}", other),
        }
        Ok(triggers)
    }
}

/// Evaluate a filter list in order; a later `!pattern` excludes again
fn patterns_match(patterns: &[String], name: &str) -> bool {
    let mut matched = false;
    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            matched &= !glob_matches(negated, name);
        } else if glob_matches(pattern, name) {
            matched = true;
        }
    }
    matched
}

/// Match a ref name against one filter pattern
///
/// `*` stays within one path segment and `**` crosses segments. `?` makes
/// the preceding character optional and `+` lets it repeat. `[...]` is a
/// character class. A leading `!` is handled by the list, not here.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let mut expr = String::from("^");
    let mut chars = pattern.chars().peekable();
    // Whether the previous token can take `?` or `+`
    let mut quantifiable = false;
    while let Some(c) = chars.next() {
        quantifiable = match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                expr.push_str(".*");
                false
            }
            '*' => {
                expr.push_str("[^/]*");
                false
            }
            '?' | '+' if quantifiable => {
                expr.push(c);
                false
            }
            '[' => {
                expr.push(c);
                for c in chars.by_ref() {
                    expr.push(c);
                    if c == ']' {
                        break;
                    }
                }
                true
            }
            other => {
                expr.push_str(&regex::escape(&other.to_string()));
                true
            }
        };
    }
    expr.push('$');

    Regex::new(&expr).is_ok_and(|re| re.is_match(name))
}
