use std::collections::HashSet;

use crate::error::CoordinationError;

use super::model::ExecutionPlan;

/// Structural checks run before any task is scheduled.
///
/// Cycles are detected later by the dependency resolver; everything here is
/// about ids: uniqueness across both collections and edges that only ever
/// point at steps.
pub(super) fn validate_plan(plan: &ExecutionPlan) -> Result<(), CoordinationError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for id in plan
        .steps
        .iter()
        .map(|s| s.id.as_str())
        .chain(plan.parallel_tasks.iter().map(|t| t.id.as_str()))
    {
        if !seen.insert(id) {
            return Err(CoordinationError::DuplicateTaskId(id.to_string()));
        }
    }

    let step_ids: HashSet<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
    let parallel_ids: HashSet<&str> = plan.parallel_tasks.iter().map(|t| t.id.as_str()).collect();

    let check_prerequisite = |prerequisite: &str, dependent: &str| {
        if parallel_ids.contains(prerequisite) {
            return Err(CoordinationError::ParallelTaskDependency {
                prerequisite_id: prerequisite.to_string(),
                dependent_id: dependent.to_string(),
            });
        }
        if !step_ids.contains(prerequisite) {
            return Err(CoordinationError::DependencyNotFound {
                task_id: dependent.to_string(),
                missing_dep: prerequisite.to_string(),
            });
        }
        Ok(())
    };

    for step in &plan.steps {
        for dep in &step.dependencies {
            check_prerequisite(dep, &step.id)?;
        }
    }

    for edge in &plan.dependencies {
        if parallel_ids.contains(edge.dependent_id.as_str()) {
            return Err(CoordinationError::ParallelTaskDependency {
                prerequisite_id: edge.prerequisite_id.clone(),
                dependent_id: edge.dependent_id.clone(),
            });
        }
        if !step_ids.contains(edge.dependent_id.as_str()) {
            return Err(CoordinationError::DependencyNotFound {
                task_id: edge.dependent_id.clone(),
                missing_dep: edge.prerequisite_id.clone(),
            });
        }
        check_prerequisite(&edge.prerequisite_id, &edge.dependent_id)?;
    }

    Ok(())
}
