//! Run planning - which job instances an event schedules

use crate::workflow::config::{
    matrix_reference, scalar_to_string, JobConfig, OrderedMap, StepConfig, StrategyConfig,
    WorkflowConfig,
};
use crate::workflow::{Event, Os, StepKind};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use tracing::debug;

/// One resolved combination of matrix values
pub type MatrixCombination = Vec<(String, String)>;

/// A step after matrix substitution and classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    /// Display name
    pub name: String,

    #[serde(flatten)]
    pub kind: StepKind,

    /// Step condition, kept verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// One scheduled instance of a job (one matrix combination)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInstance {
    pub job_id: String,

    /// Display name, with matrix values appended for matrix jobs
    pub name: String,

    /// Runner label after substitution
    pub runs_on: String,

    /// Operating system derived from the runner label
    pub os: Option<Os>,

    pub matrix: MatrixCombination,

    pub needs: Vec<String>,

    /// Cap on concurrently running instances of the same job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    pub steps: Vec<PlannedStep>,
}

/// The job instances one event schedules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub event: Event,
    pub instances: Vec<JobInstance>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Instances belonging to one job
    pub fn instances_of<'a>(
        &'a self,
        job_id: &'a str,
    ) -> impl Iterator<Item = &'a JobInstance> + 'a {
        self.instances.iter().filter(move |i| i.job_id == job_id)
    }
}

/// Plan the job instances `event` schedules
///
/// Events filtered out by the workflow's triggers schedule nothing. Instances
/// are ordered by job declaration, then matrix order.
pub fn plan(workflow: &WorkflowConfig, event: &Event) -> Plan {
    if !workflow.triggers.matches(event) {
        debug!("{} does not trigger the workflow", event);
        return Plan {
            event: event.clone(),
            instances: Vec::new(),
        };
    }

    let instances: Vec<JobInstance> = workflow
        .jobs
        .iter()
        .flat_map(|(id, job)| expand_job(id, job))
        .collect();

    debug!("{} schedules {} job instance(s)", event, instances.len());

    Plan {
        event: event.clone(),
        instances,
    }
}

/// Expand one job into its matrix instances
pub fn expand_job(job_id: &str, job: &JobConfig) -> Vec<JobInstance> {
    let base_name = job.name.clone().unwrap_or_else(|| job_id.to_string());
    let keys = matrix_keys(job);
    let max_parallel = job.strategy.as_ref().and_then(|s| s.max_parallel);

    expand_matrix(job.strategy.as_ref())
        .into_iter()
        .map(|combination| {
            let runs_on = substitute(&job.runs_on, &combination, &keys);
            let name = if combination.is_empty() {
                base_name.clone()
            } else {
                let values: Vec<&str> = combination.iter().map(|(_, v)| v.as_str()).collect();
                format!("{} ({})", base_name, values.join(", "))
            };
            let steps = plan_steps(job, &combination);

            JobInstance {
                job_id: job_id.to_string(),
                name,
                os: Os::from_runner_label(&runs_on),
                runs_on,
                matrix: combination,
                needs: job.needs.clone(),
                max_parallel,
                steps,
            }
        })
        .collect()
}

/// Plan a job's steps for one matrix combination
pub fn plan_steps(job: &JobConfig, combination: &MatrixCombination) -> Vec<PlannedStep> {
    let keys = matrix_keys(job);
    job.steps
        .iter()
        .map(|step| plan_step(step, combination, &keys))
        .collect()
}

fn matrix_keys(job: &JobConfig) -> HashSet<String> {
    job.strategy
        .as_ref()
        .map(|strategy| strategy.matrix.keys())
        .unwrap_or_default()
}

fn plan_step(
    step: &StepConfig,
    combination: &MatrixCombination,
    keys: &HashSet<String>,
) -> PlannedStep {
    let mut resolved = step.clone();
    if let Some(run) = &step.run {
        resolved.run = Some(substitute(run, combination, keys));
    }
    for value in resolved.with.values_mut() {
        if let Value::String(s) = value {
            *s = substitute(s, combination, keys);
        }
    }

    let kind = StepKind::classify(&resolved);
    let name = resolved.name.clone().unwrap_or_else(|| kind.describe());

    PlannedStep {
        name,
        kind,
        condition: resolved.condition,
    }
}

/// Resolve a strategy into its matrix combinations
///
/// The cartesian product of the axes, minus `exclude` entries, plus `include`
/// entries. An include that agrees with existing combinations on every
/// original axis extends them; otherwise it becomes a combination of its
/// own. Jobs without a matrix have exactly one, empty, combination.
pub fn expand_matrix(strategy: Option<&StrategyConfig>) -> Vec<MatrixCombination> {
    let matrix = match strategy {
        Some(strategy) => &strategy.matrix,
        None => return vec![Vec::new()],
    };

    let mut combinations: Vec<MatrixCombination> = vec![Vec::new()];
    for (axis, values) in matrix.axes.iter() {
        combinations = combinations
            .into_iter()
            .flat_map(|combination| {
                values.iter().filter_map(scalar_to_string).map(move |value| {
                    let mut next = combination.clone();
                    next.push((axis.to_string(), value));
                    next
                })
            })
            .collect();
    }
    if matrix.axes.is_empty() {
        combinations.clear();
    }

    combinations.retain(|combination| {
        !matrix
            .exclude
            .iter()
            .any(|exclude| entry_agrees(exclude, combination))
    });

    for include in &matrix.include {
        let mut extended = false;
        for combination in combinations.iter_mut() {
            let agrees = include.iter().all(|(key, value)| {
                matrix.axes.get(key).is_none()
                    || lookup(combination, key) == scalar_to_string(value).as_deref()
            });
            if agrees && !matrix.axes.is_empty() {
                for (key, value) in include.iter() {
                    if lookup(combination, key).is_none() {
                        if let Some(value) = scalar_to_string(value) {
                            combination.push((key.to_string(), value));
                        }
                    }
                }
                extended = true;
            }
        }
        if !extended {
            combinations.push(
                include
                    .iter()
                    .filter_map(|(k, v)| scalar_to_string(v).map(|v| (k.to_string(), v)))
                    .collect(),
            );
        }
    }

    if combinations.is_empty() && matrix.axes.is_empty() {
        combinations.push(Vec::new());
    }
    combinations
}

fn entry_agrees(entry: &OrderedMap<Value>, combination: &MatrixCombination) -> bool {
    entry.iter().all(|(key, value)| {
        let expected = scalar_to_string(value);
        lookup(combination, key) == expected.as_deref()
    })
}

fn lookup<'a>(combination: &'a MatrixCombination, key: &str) -> Option<&'a str> {
    combination
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Replace `${{ matrix.NAME }}` with the combination's values
///
/// A key the matrix declares but this combination lacks (an include-only
/// key, say) resolves to an empty string. Undeclared keys are left as-is.
pub fn substitute(
    template: &str,
    combination: &MatrixCombination,
    keys: &HashSet<String>,
) -> String {
    let resolve = |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        match lookup(combination, key) {
            Some(value) => value.to_string(),
            None if keys.contains(key) => String::new(),
            None => caps[0].to_string(),
        }
    };
    matrix_reference()
        .replace_all(template, resolve)
        .into_owned()
}
