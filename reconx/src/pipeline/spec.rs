//! Pipeline, stage, and merge-step specifications.
//!
//! A pipeline is an ordered list of stages; each stage holds parallel
//! tasks plus merge steps that combine task artifacts into one. Specs are
//! immutable values validated up front, so a run can never discover a
//! conflicting or dangling artifact name halfway through.

use crate::errors::ValidationError;
use crate::pool::Task;
use std::collections::{BTreeSet, HashSet};

/// How a merge step combines its input artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Concatenate inputs in declared order.
    Concat,
    /// Concatenate, then sort and deduplicate lines.
    SortUnique,
}

impl MergeKind {
    /// Applies the merge to the input contents.
    #[must_use]
    pub fn apply(self, inputs: &[String]) -> String {
        match self {
            Self::Concat => inputs.concat(),
            Self::SortUnique => {
                let lines: BTreeSet<&str> = inputs
                    .iter()
                    .flat_map(|content| content.lines())
                    .filter(|line| !line.is_empty())
                    .collect();
                let mut merged = lines.into_iter().collect::<Vec<_>>().join("\n");
                if !merged.is_empty() {
                    merged.push('\n');
                }
                merged
            }
        }
    }
}

/// A deterministic combination of artifacts into one.
#[derive(Debug, Clone)]
pub struct MergeSpec {
    /// The artifact this step produces.
    pub artifact: String,
    /// The artifacts it reads, in order.
    pub inputs: Vec<String>,
    /// The combine operation.
    pub kind: MergeKind,
}

impl MergeSpec {
    /// Creates a sort-and-deduplicate merge.
    #[must_use]
    pub fn sort_unique<I, S>(artifact: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            artifact: artifact.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            kind: MergeKind::SortUnique,
        }
    }

    /// Creates a plain concatenation merge.
    #[must_use]
    pub fn concat<I, S>(artifact: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            artifact: artifact.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            kind: MergeKind::Concat,
        }
    }
}

/// One ordered phase of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct StageSpec {
    /// Human-readable label.
    pub label: String,
    /// Tasks run in parallel within the stage.
    pub tasks: Vec<Task>,
    /// Merge steps run after all tasks have joined.
    pub merges: Vec<MergeSpec>,
}

impl StageSpec {
    /// Creates an empty stage.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tasks: Vec::new(),
            merges: Vec::new(),
        }
    }

    /// Adds a task.
    #[must_use]
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds a merge step.
    #[must_use]
    pub fn merge(mut self, merge: MergeSpec) -> Self {
        self.merges.push(merge);
        self
    }

    /// Iterates over every artifact name this stage produces.
    pub fn produced_artifacts(&self) -> impl Iterator<Item = &str> + '_ {
        self.tasks
            .iter()
            .filter_map(Task::artifact)
            .chain(self.merges.iter().map(|m| m.artifact.as_str()))
    }
}

/// An ordered pipeline definition.
#[derive(Debug, Clone, Default)]
pub struct PipelineSpec {
    /// The pipeline name, used as the report title.
    pub name: String,
    /// Artifacts seeded into the store before the first stage.
    pub inputs: Vec<String>,
    /// Stages in execution order.
    pub stages: Vec<StageSpec>,
}

impl PipelineSpec {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            stages: Vec::new(),
        }
    }

    /// Declares an artifact the caller seeds before the run.
    #[must_use]
    pub fn input(mut self, artifact: impl Into<String>) -> Self {
        self.inputs.push(artifact.into());
        self
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage(mut self, stage: StageSpec) -> Self {
        self.stages.push(stage);
        self
    }

    /// Validates the pipeline definition.
    ///
    /// Hard errors: empty names, non-flat artifact names, two producers
    /// of one artifact within a stage, merge inputs or stdin artifacts
    /// that nothing upstream produces, and use of the reserved report
    /// names.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, annotated with its stage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new(
                "pipeline name cannot be empty or whitespace-only",
            ));
        }

        // Artifacts visible to stdin resolution: inputs plus everything
        // produced by *earlier* stages. Same-stage artifacts are excluded
        // because tasks run concurrently.
        let mut settled: HashSet<&str> = self.inputs.iter().map(String::as_str).collect();
        for name in &self.inputs {
            check_artifact_name(name, "<inputs>")?;
        }

        for stage in &self.stages {
            if stage.label.trim().is_empty() {
                return Err(ValidationError::new("stage label cannot be empty"));
            }

            let mut task_names: HashSet<&str> = HashSet::new();
            let mut produced_here: HashSet<&str> = HashSet::new();

            for task in &stage.tasks {
                if task.name.trim().is_empty() {
                    return Err(
                        ValidationError::new("task name cannot be empty").in_stage(&stage.label)
                    );
                }
                if !task_names.insert(task.name.as_str()) {
                    return Err(ValidationError::new(format!(
                        "duplicate task name '{}'",
                        task.name
                    ))
                    .in_stage(&stage.label));
                }

                if let Some(artifact) = task.artifact() {
                    check_artifact_name(artifact, &stage.label)?;
                    if !produced_here.insert(artifact) {
                        return Err(ValidationError::new(format!(
                            "artifact '{artifact}' is produced twice within one stage"
                        ))
                        .in_stage(&stage.label));
                    }
                }

                if let Some(source) = &task.command.stdin_artifact {
                    if !settled.contains(source.as_str()) {
                        return Err(ValidationError::new(format!(
                            "task '{}' reads artifact '{source}' which no earlier stage produces",
                            task.name
                        ))
                        .in_stage(&stage.label));
                    }
                }
            }

            for merge in &stage.merges {
                check_artifact_name(&merge.artifact, &stage.label)?;
                if !produced_here.insert(merge.artifact.as_str()) {
                    return Err(ValidationError::new(format!(
                        "artifact '{}' is produced twice within one stage",
                        merge.artifact
                    ))
                    .in_stage(&stage.label));
                }

                for input in &merge.inputs {
                    let from_tasks = stage
                        .tasks
                        .iter()
                        .filter_map(Task::artifact)
                        .any(|a| a == input);
                    if !from_tasks && !settled.contains(input.as_str()) {
                        return Err(ValidationError::new(format!(
                            "merge '{}' reads artifact '{input}' which nothing upstream produces",
                            merge.artifact
                        ))
                        .in_stage(&stage.label));
                    }
                }
            }

            settled.extend(stage.produced_artifacts());
        }

        Ok(())
    }
}

/// Names the report builder owns; stages may not produce them.
const RESERVED: [&str; 2] = [crate::report::TEXT_ARTIFACT, crate::report::HTML_ARTIFACT];

fn check_artifact_name(name: &str, stage: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(
            ValidationError::new(format!("artifact name '{name}' is not a flat file name"))
                .in_stage(stage),
        );
    }
    if RESERVED.contains(&name) {
        return Err(ValidationError::new(format!(
            "artifact name '{name}' is reserved for the report builder"
        ))
        .in_stage(stage));
    }
    Ok(())
}
