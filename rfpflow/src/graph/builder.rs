//! Graph builder with validation.

use super::{Edge, WorkflowGraph};
use crate::catalog::{StageCatalog, StageName, StateField};
use crate::errors::{CycleDetectedError, GraphValidationError};
use crate::events::RouteTarget;
use crate::stages::Stage;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

/// Builder for creating validated workflow graphs.
///
/// Registration never fails; every check runs in [`GraphBuilder::build`].
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    entry: Option<StageName>,
    stages: Vec<Arc<dyn Stage>>,
    edges: Vec<(StageName, Edge)>,
    check_dataflow: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entry: None,
            stages: Vec::new(),
            edges: Vec::new(),
            check_dataflow: true,
        }
    }

    /// Sets the entry stage.
    #[must_use]
    pub fn entry(mut self, name: StageName) -> Self {
        self.entry = Some(name);
        self
    }

    /// Registers a stage.
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Sets the outgoing edge of `from`.
    #[must_use]
    pub fn edge(mut self, from: StageName, edge: Edge) -> Self {
        self.edges.push((from, edge));
        self
    }

    /// Skips the catalog read/write check.
    ///
    /// Useful for partial graphs whose stages do not follow the catalog.
    #[must_use]
    pub fn without_dataflow_check(mut self) -> Self {
        self.check_dataflow = false;
        self
    }

    /// Returns the number of registered stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Validates and builds the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is missing or unregistered, a stage is
    /// registered twice, a stage does not have exactly one edge, an edge
    /// points at an unregistered stage, a stage is unreachable, unconditional
    /// edges form a cycle, or a stage may read a field no earlier stage
    /// wrote.
    pub fn build(self) -> Result<WorkflowGraph, GraphValidationError> {
        let entry = self
            .entry
            .ok_or_else(|| GraphValidationError::new("Graph has no entry stage"))?;

        let mut stages = BTreeMap::new();
        for stage in &self.stages {
            if stages.insert(stage.name(), Arc::clone(stage)).is_some() {
                return Err(GraphValidationError::new(format!(
                    "Stage '{}' is registered more than once",
                    stage.name()
                ))
                .with_stages(vec![stage.name()]));
            }
        }
        if stages.is_empty() {
            return Err(GraphValidationError::new("Graph has no stages"));
        }
        if !stages.contains_key(&entry) {
            return Err(GraphValidationError::new(format!(
                "Entry stage '{entry}' is not registered"
            ))
            .with_stages(vec![entry]));
        }

        let mut edges = BTreeMap::new();
        for (from, edge) in &self.edges {
            if !stages.contains_key(from) {
                return Err(GraphValidationError::new(format!(
                    "Edge leaves unregistered stage '{from}'"
                ))
                .with_stages(vec![*from]));
            }
            if edges.insert(*from, edge.clone()).is_some() {
                return Err(GraphValidationError::new(format!(
                    "Stage '{from}' has more than one outgoing edge"
                ))
                .with_stages(vec![*from]));
            }
            for target in edge.targets() {
                if let RouteTarget::Stage(to) = target {
                    if !stages.contains_key(&to) {
                        return Err(GraphValidationError::new(format!(
                            "Stage '{from}' routes to unregistered stage '{to}'"
                        ))
                        .with_stages(vec![*from, to]));
                    }
                }
            }
            if let Edge::Conditional { targets, .. } = edge {
                if targets.is_empty() {
                    return Err(GraphValidationError::new(format!(
                        "Conditional edge of '{from}' declares no targets"
                    ))
                    .with_stages(vec![*from]));
                }
            }
        }

        let missing: Vec<StageName> = stages
            .keys()
            .filter(|name| !edges.contains_key(*name))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(GraphValidationError::new(format!(
                "Stages without an outgoing edge: {}",
                join(&missing)
            ))
            .with_stages(missing));
        }

        let reachable = reachable_from(entry, &edges);
        let unreachable: Vec<StageName> = stages
            .keys()
            .filter(|name| !reachable.contains(*name))
            .copied()
            .collect();
        if !unreachable.is_empty() {
            return Err(GraphValidationError::new(format!(
                "Stages unreachable from '{entry}': {}",
                join(&unreachable)
            ))
            .with_stages(unreachable));
        }

        detect_unconditional_cycles(&edges)?;

        if self.check_dataflow {
            check_dataflow(entry, &edges)?;
        }

        Ok(WorkflowGraph::new(entry, stages, edges))
    }
}

fn successors(edge: &Edge) -> impl Iterator<Item = StageName> {
    edge.targets().into_iter().filter_map(|target| match target {
        RouteTarget::Stage(name) => Some(name),
        RouteTarget::End => None,
    })
}

fn reachable_from(entry: StageName, edges: &BTreeMap<StageName, Edge>) -> HashSet<StageName> {
    let mut seen = HashSet::from([entry]);
    let mut queue = VecDeque::from([entry]);
    while let Some(node) = queue.pop_front() {
        if let Some(edge) = edges.get(&node) {
            for next in successors(edge) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    seen
}

/// Cycles are only allowed through conditional edges.
fn detect_unconditional_cycles(
    edges: &BTreeMap<StageName, Edge>,
) -> Result<(), CycleDetectedError> {
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for name in edges.keys() {
        if !visited.contains(name) {
            if let Some(cycle) = dfs_cycle(*name, edges, &mut visited, &mut rec_stack, &mut path) {
                return Err(CycleDetectedError::new(cycle));
            }
        }
    }

    Ok(())
}

fn dfs_cycle(
    node: StageName,
    edges: &BTreeMap<StageName, Edge>,
    visited: &mut HashSet<StageName>,
    rec_stack: &mut HashSet<StageName>,
    path: &mut Vec<StageName>,
) -> Option<Vec<StageName>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(Edge::To(next)) = edges.get(&node) {
        if !visited.contains(next) {
            if let Some(cycle) = dfs_cycle(*next, edges, visited, rec_stack, path) {
                return Some(cycle);
            }
        } else if rec_stack.contains(next) {
            let start = path.iter().position(|n| n == next).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(*next);
            return Some(cycle);
        }
    }

    path.pop();
    rec_stack.remove(&node);
    None
}

/// Checks that every stage's reads are written on every path from the entry.
///
/// Computes the fields guaranteed available on entry to each stage as the
/// intersection over its predecessors, iterated to a fixed point.
fn check_dataflow(
    entry: StageName,
    edges: &BTreeMap<StageName, Edge>,
) -> Result<(), GraphValidationError> {
    let all_fields: BTreeSet<StateField> = StageCatalog::all()
        .iter()
        .flat_map(|d| d.reads.iter().chain(d.writes.iter()))
        .copied()
        .chain(StateField::INITIAL)
        .collect();
    let initial: BTreeSet<StateField> = StateField::INITIAL.into_iter().collect();

    let mut available: BTreeMap<StageName, BTreeSet<StateField>> = edges
        .keys()
        .map(|name| (*name, all_fields.clone()))
        .collect();
    available.insert(entry, initial.clone());

    let mut changed = true;
    while changed {
        changed = false;
        for (from, edge) in edges {
            let mut out = available.get(from).cloned().unwrap_or_default();
            out.extend(StageCatalog::descriptor(*from).writes.iter().copied());
            for to in successors(edge) {
                let Some(current) = available.get(&to) else {
                    continue;
                };
                let mut narrowed: BTreeSet<StateField> =
                    current.intersection(&out).copied().collect();
                if to == entry {
                    narrowed = narrowed.intersection(&initial).copied().collect();
                }
                if &narrowed != current {
                    available.insert(to, narrowed);
                    changed = true;
                }
            }
        }
    }

    for (name, fields) in &available {
        for read in StageCatalog::descriptor(*name).reads {
            if !fields.contains(read) {
                return Err(GraphValidationError::new(format!(
                    "Stage '{name}' reads '{read}' which is not written on every path from '{entry}'"
                ))
                .with_stages(vec![*name]));
            }
        }
    }

    Ok(())
}

fn join(names: &[StageName]) -> String {
    names
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::compliance_route;
    use crate::stages::PassThroughStage;

    fn pass(name: StageName) -> Arc<dyn Stage> {
        Arc::new(PassThroughStage::new(name))
    }

    #[test]
    fn test_missing_entry() {
        let err = GraphBuilder::new()
            .stage(pass(StageName::ScoreProposal))
            .edge(StageName::ScoreProposal, Edge::End)
            .build()
            .unwrap_err();

        assert!(err.message.contains("no entry"));
    }

    #[test]
    fn test_unregistered_entry() {
        let err = GraphBuilder::new()
            .entry(StageName::ExtractDocument)
            .stage(pass(StageName::ScoreProposal))
            .edge(StageName::ScoreProposal, Edge::End)
            .build()
            .unwrap_err();

        assert_eq!(err.stages, vec![StageName::ExtractDocument]);
    }

    #[test]
    fn test_duplicate_stage() {
        let err = GraphBuilder::new()
            .entry(StageName::ScoreProposal)
            .stage(pass(StageName::ScoreProposal))
            .stage(pass(StageName::ScoreProposal))
            .edge(StageName::ScoreProposal, Edge::End)
            .build()
            .unwrap_err();

        assert!(err.message.contains("more than once"));
    }

    #[test]
    fn test_missing_edge() {
        let err = GraphBuilder::new()
            .entry(StageName::GenerateDraft)
            .stage(pass(StageName::GenerateDraft))
            .stage(pass(StageName::ScoreProposal))
            .edge(StageName::GenerateDraft, Edge::To(StageName::ScoreProposal))
            .without_dataflow_check()
            .build()
            .unwrap_err();

        assert_eq!(err.stages, vec![StageName::ScoreProposal]);
    }

    #[test]
    fn test_two_edges_from_one_stage() {
        let err = GraphBuilder::new()
            .entry(StageName::ScoreProposal)
            .stage(pass(StageName::ScoreProposal))
            .edge(StageName::ScoreProposal, Edge::End)
            .edge(StageName::ScoreProposal, Edge::End)
            .build()
            .unwrap_err();

        assert!(err.message.contains("more than one outgoing edge"));
    }

    #[test]
    fn test_unregistered_target() {
        let err = GraphBuilder::new()
            .entry(StageName::GenerateDraft)
            .stage(pass(StageName::GenerateDraft))
            .edge(StageName::GenerateDraft, Edge::To(StageName::OptimizeTone))
            .build()
            .unwrap_err();

        assert_eq!(
            err.stages,
            vec![StageName::GenerateDraft, StageName::OptimizeTone]
        );
    }

    #[test]
    fn test_unreachable_stage() {
        let err = GraphBuilder::new()
            .entry(StageName::GenerateDraft)
            .stage(pass(StageName::GenerateDraft))
            .stage(pass(StageName::ScoreProposal))
            .edge(StageName::GenerateDraft, Edge::End)
            .edge(StageName::ScoreProposal, Edge::End)
            .without_dataflow_check()
            .build()
            .unwrap_err();

        assert_eq!(err.stages, vec![StageName::ScoreProposal]);
    }

    #[test]
    fn test_unconditional_cycle_rejected() {
        let err = GraphBuilder::new()
            .entry(StageName::OptimizeTone)
            .stage(pass(StageName::OptimizeTone))
            .stage(pass(StageName::CheckCompliance))
            .edge(StageName::OptimizeTone, Edge::To(StageName::CheckCompliance))
            .edge(StageName::CheckCompliance, Edge::To(StageName::OptimizeTone))
            .without_dataflow_check()
            .build()
            .unwrap_err();

        assert!(err.message.contains("Cycle detected"));
        assert_eq!(err.stages.first(), err.stages.last());
    }

    #[test]
    fn test_conditional_cycle_allowed() {
        let graph = GraphBuilder::new()
            .entry(StageName::OptimizeTone)
            .stage(pass(StageName::OptimizeTone))
            .stage(pass(StageName::CheckCompliance))
            .stage(pass(StageName::ScoreProposal))
            .edge(StageName::OptimizeTone, Edge::To(StageName::CheckCompliance))
            .edge(StageName::CheckCompliance, compliance_route(2))
            .edge(StageName::ScoreProposal, Edge::End)
            .without_dataflow_check()
            .build();

        assert!(graph.is_ok());
    }

    #[test]
    fn test_dataflow_rejects_skipped_producer() {
        // Drafting straight from extraction skips references and summaries.
        let err = GraphBuilder::new()
            .entry(StageName::ExtractDocument)
            .stage(pass(StageName::ExtractDocument))
            .stage(pass(StageName::GenerateDraft))
            .edge(StageName::ExtractDocument, Edge::To(StageName::GenerateDraft))
            .edge(StageName::GenerateDraft, Edge::End)
            .build()
            .unwrap_err();

        assert!(err.message.contains("Generate Draft"));
        assert!(err.message.contains("references"));
    }

    #[test]
    fn test_dataflow_rejects_conditional_bypass() {
        let err = GraphBuilder::new()
            .entry(StageName::ExtractDocument)
            .stage(pass(StageName::ExtractDocument))
            .stage(pass(StageName::EnrichRequest))
            .stage(pass(StageName::CheckCompliance))
            .edge(
                StageName::ExtractDocument,
                Edge::conditional(
                    [
                        RouteTarget::Stage(StageName::EnrichRequest),
                        RouteTarget::Stage(StageName::CheckCompliance),
                    ],
                    |_| RouteTarget::Stage(StageName::EnrichRequest),
                ),
            )
            .edge(StageName::EnrichRequest, Edge::To(StageName::CheckCompliance))
            .edge(StageName::CheckCompliance, Edge::End)
            .build()
            .unwrap_err();

        // No path writes a draft before the check.
        assert_eq!(err.stages, vec![StageName::CheckCompliance]);
    }
}
