// ── Dependency graph and scheduler ──
//
// Resources live in an arena (`petgraph::DiGraph`) indexed by declaration
// order. Edges point from dependency to dependent and come from three
// places: explicit ordering edges, response bindings, and guards whose
// target is declared in the same graph. The execution order is Kahn's
// algorithm with a min-heap over declaration index, so independent
// resources always run in the order they were declared.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{ResourceDescriptor, ResourceSpec};

// ── Builder ─────────────────────────────────────────────────────────

/// Collects descriptors and ordering edges, then validates them into a
/// [`Plan`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    resources: Vec<ResourceDescriptor>,
    /// `(dependent, dependency)` pairs declared outside the descriptors.
    edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, descriptor: ResourceDescriptor) -> &mut Self {
        self.resources.push(descriptor);
        self
    }

    pub fn add_spec(&mut self, spec: &impl ResourceSpec) -> &mut Self {
        self.add(spec.describe())
    }

    /// Declare that `dependent` must run after `dependency`, with no value
    /// flowing between them.
    pub fn order_after(&mut self, dependent: &str, dependency: &str) -> &mut Self {
        self.edges.push((dependent.to_owned(), dependency.to_owned()));
        self
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Validate every reference and compute the execution order.
    pub fn build(self) -> Result<Plan, CoreError> {
        let Self { resources, edges } = self;

        let mut graph: DiGraph<String, ()> = DiGraph::with_capacity(resources.len(), 0);
        let mut index: HashMap<String, NodeIndex> = HashMap::with_capacity(resources.len());
        for r in &resources {
            if index.contains_key(&r.name) {
                return Err(CoreError::DuplicateResource {
                    name: r.name.clone(),
                });
            }
            index.insert(r.name.clone(), graph.add_node(r.name.clone()));
        }

        for r in &resources {
            let me = index[&r.name];
            for dep in &r.depends_on {
                let from = lookup_dependency(&index, &r.name, dep)?;
                graph.update_edge(from, me, ());
            }
            for from in binding_sources(r, &index)? {
                graph.update_edge(from, me, ());
            }
            for guard in &r.guards {
                if let Some(&from) = index.get(guard.target()) {
                    if from == me {
                        return Err(CoreError::SelfReference {
                            resource: r.name.clone(),
                        });
                    }
                    graph.update_edge(from, me, ());
                }
            }
        }
        for (dependent, dependency) in &edges {
            let to = index
                .get(dependent)
                .copied()
                .ok_or_else(|| CoreError::ValidationFailed {
                    message: format!("ordering edge names undeclared resource '{dependent}'"),
                })?;
            let from = lookup_dependency(&index, dependent, dependency)?;
            graph.update_edge(from, to, ());
        }

        let order = stable_topological_order(&graph)?;
        debug!(resources = order.len(), edges = graph.edge_count(), "plan built");

        let mut slots: Vec<Option<ResourceDescriptor>> = resources.into_iter().map(Some).collect();
        let mut steps = Vec::with_capacity(order.len());
        for node in order {
            let Some(descriptor) = slots.get_mut(node.index()).and_then(Option::take) else {
                return Err(CoreError::Internal(format!(
                    "node {} scheduled twice",
                    node.index()
                )));
            };
            let mut dependencies: Vec<NodeIndex> =
                graph.neighbors_directed(node, Direction::Incoming).collect();
            dependencies.sort_unstable();
            steps.push(PlanStep {
                descriptor,
                dependencies: dependencies.into_iter().map(|d| graph[d].clone()).collect(),
            });
        }

        let positions = steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.descriptor.name.clone(), i))
            .collect();
        Ok(Plan { steps, positions })
    }
}

fn lookup_dependency(
    index: &HashMap<String, NodeIndex>,
    resource: &str,
    dependency: &str,
) -> Result<NodeIndex, CoreError> {
    if resource == dependency {
        return Err(CoreError::SelfReference {
            resource: resource.to_owned(),
        });
    }
    index
        .get(dependency)
        .copied()
        .ok_or_else(|| CoreError::UnknownDependency {
            resource: resource.to_owned(),
            dependency: dependency.to_owned(),
        })
}

/// Graph nodes whose responses `r` binds to.
fn binding_sources(
    r: &ResourceDescriptor,
    index: &HashMap<String, NodeIndex>,
) -> Result<Vec<NodeIndex>, CoreError> {
    let unresolved = |b: &crate::model::ResponseBinding| CoreError::UnresolvedBinding {
        resource: r.name.clone(),
        source_resource: b.resource.clone(),
        field: b.field.to_string(),
    };

    let mut sources = Vec::new();

    let forward = std::iter::once(&r.create).chain(r.update.as_ref());
    for binding in forward.flat_map(|a| a.parameters.bindings()) {
        if binding.resource == r.name {
            return Err(CoreError::SelfReference {
                resource: r.name.clone(),
            });
        }
        sources.push(*index.get(&binding.resource).ok_or_else(|| unresolved(binding))?);
    }

    // Teardown parameters may read this resource's own creation response;
    // they are stored with the record, so sensitive fields are off limits.
    for action in r.teardown() {
        for binding in action.parameters.bindings() {
            if binding.resource == r.name {
                if r.is_sensitive(&binding.field) {
                    return Err(CoreError::ValidationFailed {
                        message: format!(
                            "deletion of '{}' binds to sensitive field '{}'",
                            r.name, binding.field
                        ),
                    });
                }
                continue;
            }
            sources.push(*index.get(&binding.resource).ok_or_else(|| unresolved(binding))?);
        }
    }
    Ok(sources)
}

/// Kahn's algorithm; ready nodes leave in declaration order.
fn stable_topological_order(graph: &DiGraph<String, ()>) -> Result<Vec<NodeIndex>, CoreError> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            let degree = &mut in_degree[next.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() == graph.node_count() {
        return Ok(order);
    }

    // Report the first strongly connected component that forms a cycle.
    let mut cycle = tarjan_scc(graph)
        .into_iter()
        .find(|scc| scc.len() > 1)
        .unwrap_or_default();
    cycle.sort_unstable();
    let mut names: Vec<String> = cycle.iter().map(|n| graph[*n].clone()).collect();
    if let Some(first) = names.first().cloned() {
        names.push(first);
    }
    Err(CoreError::CyclicDependency { cycle: names })
}

// ── Plan ────────────────────────────────────────────────────────────

/// One resource in execution position, with its direct dependencies.
#[derive(Debug, Clone)]
pub struct PlanStep {
    pub descriptor: ResourceDescriptor,
    /// Explicit and implied dependencies, in declaration order.
    pub dependencies: Vec<String>,
}

/// A validated, topologically sorted set of resources.
#[derive(Debug, Clone)]
pub struct Plan {
    steps: Vec<PlanStep>,
    positions: HashMap<String, usize>,
}

impl Plan {
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Logical names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.descriptor.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&PlanStep> {
        self.positions.get(name).and_then(|&i| self.steps.get(i))
    }

    /// Position of `name` in the execution order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// `root` and everything that transitively depends on it, in execution
    /// order. Empty when `root` is not part of the plan.
    pub fn dependents_of(&self, root: &str) -> Vec<&str> {
        let mut affected: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();
        for step in &self.steps {
            let name = step.descriptor.name.as_str();
            if name == root || step.dependencies.iter().any(|d| affected.contains(d.as_str())) {
                affected.insert(name);
                out.push(name);
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ActionSpec, Guard, LifecycleStatus, ParamValue, bind};

    fn res(name: &str) -> ResourceDescriptor {
        ResourceDescriptor::custom(name, ActionSpec::new("svc", "Create", ParamValue::Null))
    }

    fn res_with(name: &str, params: ParamValue) -> ResourceDescriptor {
        ResourceDescriptor::custom(name, ActionSpec::new("svc", "Create", params))
    }

    #[test]
    fn independent_resources_keep_declaration_order() {
        let mut b = GraphBuilder::new();
        b.add(res("c")).add(res("a")).add(res("b"));
        assert_eq!(b.build().unwrap().names(), vec!["c", "a", "b"]);
    }

    #[test]
    fn explicit_and_binding_edges_are_honoured() {
        let mut b = GraphBuilder::new();
        b.add(res_with("vehicle", bind("decoder", "arn")))
            .add(res("decoder").after("model"))
            .add(res("model"));
        let plan = b.build().unwrap();

        assert_eq!(plan.names(), vec!["model", "decoder", "vehicle"]);
        assert_eq!(plan.get("vehicle").unwrap().dependencies, vec!["decoder"]);
    }

    #[test]
    fn order_after_adds_pure_ordering_edge() {
        let mut b = GraphBuilder::new();
        b.add(res("attach")).add(res("cert"));
        b.order_after("attach", "cert");
        assert_eq!(b.build().unwrap().names(), vec!["cert", "attach"]);
    }

    #[test]
    fn declared_guard_target_orders_before_guarded() {
        let mut b = GraphBuilder::new();
        b.add(res("activate").with_guard(Guard::Transition {
            target: "manifest".into(),
            to: LifecycleStatus::Active,
        }))
        .add(res("manifest"));
        assert_eq!(b.build().unwrap().names(), vec!["manifest", "activate"]);
    }

    #[test]
    fn cycle_is_reported_with_members() {
        let mut b = GraphBuilder::new();
        b.add(res("a").after("c"))
            .add(res("b").after("a"))
            .add(res("c").after("b"))
            .add(res("free"));
        match b.build().unwrap_err() {
            CoreError::CyclicDependency { cycle } => {
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut b = GraphBuilder::new();
        b.add(res("a")).add(res("a"));
        assert!(matches!(
            b.build(),
            Err(CoreError::DuplicateResource { name }) if name == "a"
        ));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut b = GraphBuilder::new();
        b.add(res("a").after("ghost"));
        assert!(matches!(b.build(), Err(CoreError::UnknownDependency { .. })));
    }

    #[test]
    fn binding_to_undeclared_resource_is_unresolved() {
        let mut b = GraphBuilder::new();
        b.add(res_with("a", bind("ghost", "arn")));
        assert!(matches!(b.build(), Err(CoreError::UnresolvedBinding { .. })));
    }

    #[test]
    fn creation_binding_to_self_is_rejected() {
        let mut b = GraphBuilder::new();
        b.add(res_with("a", bind("a", "arn")));
        assert!(matches!(b.build(), Err(CoreError::SelfReference { .. })));
    }

    #[test]
    fn deletion_may_bind_to_own_response() {
        let mut b = GraphBuilder::new();
        b.add(res("cert").with_delete(ActionSpec::new(
            "iot",
            "DeleteCertificate",
            ParamValue::map([("certificateId", bind("cert", "certificateId"))]),
        )));
        assert_eq!(b.build().unwrap().names(), vec!["cert"]);
    }

    #[test]
    fn deletion_binding_to_own_sensitive_field_is_rejected() {
        let mut b = GraphBuilder::new();
        b.add(
            res("cert")
                .sensitive("keyPair.PrivateKey")
                .with_delete(ActionSpec::new(
                    "iot",
                    "DeleteCertificate",
                    bind("cert", "keyPair.PrivateKey"),
                )),
        );
        assert!(matches!(b.build(), Err(CoreError::ValidationFailed { .. })));
    }

    #[test]
    fn pre_delete_binding_to_own_sensitive_field_is_rejected() {
        let mut b = GraphBuilder::new();
        b.add(
            res("cert")
                .sensitive("keyPair.PrivateKey")
                .before_delete(ActionSpec::new(
                    "iot",
                    "UpdateCertificate",
                    bind("cert", "keyPair.PrivateKey"),
                )),
        );
        assert!(matches!(b.build(), Err(CoreError::ValidationFailed { .. })));
    }

    #[test]
    fn dependents_follow_every_edge_kind_transitively() {
        let mut b = GraphBuilder::new();
        b.add(res("cert"))
            .add(res("thing"))
            .add(res_with("attach", bind("cert", "arn")))
            .add(res("secret").after("attach"))
            .add(res("vehicle").after("thing"));
        let plan = b.build().unwrap();

        assert_eq!(plan.dependents_of("cert"), vec!["cert", "attach", "secret"]);
        assert_eq!(plan.dependents_of("vehicle"), vec!["vehicle"]);
        assert!(plan.dependents_of("ghost").is_empty());
    }
}
