//! Workflow configuration from YAML

use crate::workflow::trigger::Triggers;
use anyhow::{Context, Result};
use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::OnceLock;

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    #[serde(default)]
    pub name: Option<String>,

    /// Events that trigger the workflow
    #[serde(rename = "on")]
    pub triggers: Triggers,

    /// Jobs in declaration order
    pub jobs: OrderedMap<JobConfig>,
}

/// A single job as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Human-readable job name
    #[serde(default)]
    pub name: Option<String>,

    /// Runner label, possibly referencing a matrix axis
    #[serde(rename = "runs-on")]
    pub runs_on: String,

    /// Jobs that must finish before this one
    #[serde(default, deserialize_with = "one_or_many")]
    pub needs: Vec<String>,

    /// Matrix strategy
    #[serde(default)]
    pub strategy: Option<StrategyConfig>,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Job strategy: matrix and failure policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub matrix: MatrixConfig,

    /// Cancel sibling instances when one fails
    #[serde(rename = "fail-fast", default = "default_fail_fast")]
    pub fail_fast: bool,

    /// Upper bound on instances of this job running at once
    #[serde(rename = "max-parallel", default)]
    pub max_parallel: Option<usize>,
}

fn default_fail_fast() -> bool {
    true
}

/// Matrix definition: named axes plus include/exclude adjustments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default)]
    pub include: Vec<OrderedMap<Value>>,

    #[serde(default)]
    pub exclude: Vec<OrderedMap<Value>>,

    /// Axis name to its values, in declaration order
    #[serde(flatten)]
    pub axes: OrderedMap<Vec<Value>>,
}

/// A step as defined in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    /// Action reference (`owner/repo@ref`)
    #[serde(default)]
    pub uses: Option<String>,

    /// Shell command
    #[serde(default)]
    pub run: Option<String>,

    /// Action inputs
    #[serde(default)]
    pub with: BTreeMap<String, Value>,

    /// Step condition expression
    #[serde(rename = "if", default)]
    pub condition: Option<String>,
}

impl StepConfig {
    /// Get a `with` input rendered as a string
    pub fn input(&self, key: &str) -> Option<String> {
        self.with.get(key).and_then(scalar_to_string)
    }
}

/// Render a scalar YAML value the way expressions see it
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Pattern for `${{ matrix.NAME }}` expressions
pub(crate) fn matrix_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{\{\s*matrix\.([A-Za-z0-9_-]+)\s*\}\}").expect("valid matrix pattern")
    })
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse workflow configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Look up a job by id
    pub fn job(&self, id: &str) -> Option<&JobConfig> {
        self.jobs.get(id)
    }

    /// Validate the workflow configuration
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            anyhow::bail!("Workflow defines no jobs");
        }

        let job_ids: HashSet<&str> = self.jobs.keys().collect();

        for (id, job) in self.jobs.iter() {
            if job.steps.is_empty() {
                anyhow::bail!("Job '{}' has no steps", id);
            }

            for (index, step) in job.steps.iter().enumerate() {
                match (&step.uses, &step.run) {
                    (Some(_), Some(_)) => anyhow::bail!(
                        "Job '{}' step {} sets both 'uses' and 'run'",
                        id,
                        index + 1
                    ),
                    (None, None) => anyhow::bail!(
                        "Job '{}' step {} needs either 'uses' or 'run'",
                        id,
                        index + 1
                    ),
                    _ => {}
                }
            }

            for dep in &job.needs {
                if !job_ids.contains(dep.as_str()) {
                    anyhow::bail!("Job '{}' needs non-existent job '{}'", id, dep);
                }
            }

            let declared = match &job.strategy {
                Some(strategy) => {
                    strategy.matrix.validate(id)?;
                    strategy.matrix.keys()
                }
                None => HashSet::new(),
            };
            for capture in matrix_reference().captures_iter(&job.runs_on) {
                let axis = &capture[1];
                if !declared.contains(axis) {
                    anyhow::bail!(
                        "Job '{}' runs-on references undeclared matrix axis '{}'",
                        id,
                        axis
                    );
                }
            }
        }

        self.check_cycles()?;

        Ok(())
    }

    /// Check for cycles in the `needs` graph
    fn check_cycles(&self) -> Result<()> {
        let mut visited = HashSet::new();
        let mut recursion_stack = HashSet::new();

        for id in self.jobs.keys() {
            if !visited.contains(id) {
                self.dfs_check(id, &mut visited, &mut recursion_stack)?;
            }
        }

        Ok(())
    }

    fn dfs_check(
        &self,
        job_id: &str,
        visited: &mut HashSet<String>,
        recursion_stack: &mut HashSet<String>,
    ) -> Result<()> {
        visited.insert(job_id.to_string());
        recursion_stack.insert(job_id.to_string());

        if let Some(job) = self.jobs.get(job_id) {
            for dep in &job.needs {
                if recursion_stack.contains(dep) {
                    anyhow::bail!("Cycle detected in job dependencies involving '{}'", dep);
                }
                if !visited.contains(dep) {
                    self.dfs_check(dep, visited, recursion_stack)?;
                }
            }
        }

        recursion_stack.remove(job_id);
        Ok(())
    }
}

impl MatrixConfig {
    /// Every key a matrix expression may reference: axes and include keys
    pub fn keys(&self) -> HashSet<String> {
        let mut keys: HashSet<String> = self.axes.keys().map(str::to_string).collect();
        for entry in &self.include {
            keys.extend(entry.keys().map(str::to_string));
        }
        keys
    }

    fn validate(&self, job_id: &str) -> Result<()> {
        for (axis, values) in self.axes.iter() {
            if values.is_empty() {
                anyhow::bail!("Job '{}' matrix axis '{}' has no values", job_id, axis);
            }
            if values.iter().any(|v| scalar_to_string(v).is_none()) {
                anyhow::bail!(
                    "Job '{}' matrix axis '{}' must contain only scalar values",
                    job_id,
                    axis
                );
            }
        }

        for entry in self.include.iter().chain(self.exclude.iter()) {
            for (key, value) in entry.iter() {
                if scalar_to_string(value).is_none() {
                    anyhow::bail!(
                        "Job '{}' matrix entry '{}' must be a scalar value",
                        job_id,
                        key
                    );
                }
            }
        }

        Ok(())
    }
}

/// A string-keyed map that keeps YAML declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedMapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping with string keys")
            }

            fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(OrderedMap::new())
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Accept either a single string or a list of strings
fn one_or_many<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}
