//! CP-005: Reference analysis and resource ordering.
//!
//! Builds the reference graph by walking `Ref`, `GetAtt`, and `${}`
//! interpolation in every resource property and output value. Orders
//! resources with Kahn's algorithm using alphabetical tie-breaking; nodes that
//! never become ready (cycle members and their dependents) are appended in
//! alphabetical order instead of failing. [`strict_resource_order`] is the
//! opt-in variant that rejects cycles.

use super::error::ImportError;
use super::types::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

static SUB_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern is valid"));

/// True for environment-provided names (`AWS::Region`).
pub fn is_pseudo_parameter(name: &str) -> bool {
    name.starts_with(PSEUDO_PREFIX)
}

/// Names a `Sub` template string reads, in order of first appearance.
/// `${Name.Attr}` yields `Name`; pseudo-parameters and `${!Literal}` escapes
/// are skipped.
pub fn sub_references(template: &str) -> Vec<&str> {
    let mut seen = BTreeSet::new();
    SUB_VARIABLE
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().split('.').next().unwrap_or_default().trim())
        .filter(|name| !name.is_empty() && !name.starts_with('!') && !is_pseudo_parameter(name))
        .filter(|name| seen.insert(*name))
        .collect()
}

/// Build the reference graph of a template. Never fails; dangling targets are
/// recorded as-is.
pub fn analyze_references(template: &Template) -> ReferenceGraph {
    let mut graph = ReferenceGraph::default();

    for (id, resource) in &template.resources {
        let mut targets = BTreeSet::new();
        for value in resource.properties.values() {
            collect_references(value, &mut targets);
        }
        if !targets.is_empty() {
            graph.resources.insert(id.clone(), targets);
        }
    }

    for (id, output) in &template.outputs {
        let mut targets = BTreeSet::new();
        collect_references(&output.value, &mut targets);
        if !targets.is_empty() {
            graph.outputs.insert(id.clone(), targets);
        }
    }

    tracing::debug!(
        edges = graph.edges().count(),
        "reference analysis complete"
    );
    graph
}

/// Depth-first walk of one value, adding every id it reads to `out`.
pub fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::List(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Value::Map(map) => {
            for item in map.values() {
                collect_references(item, out);
            }
        }
        Value::Intrinsic(intrinsic) => {
            match intrinsic.as_ref() {
                Intrinsic::Ref(target) if !is_pseudo_parameter(target) => {
                    out.insert(target.clone());
                }
                Intrinsic::GetAtt { target, .. } => {
                    out.insert(target.clone());
                }
                Intrinsic::Sub { template, .. } => {
                    out.extend(sub_references(template).into_iter().map(str::to_string));
                }
                _ => {}
            }
            for arg in intrinsic.arguments() {
                collect_references(arg, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}

/// Resource → distinct resources it depends on. Edges to non-resources and
/// self-edges are dropped; a self-edge cannot be satisfied by any ordering.
fn resource_dependencies<'a>(
    resource_ids: &'a [String],
    graph: &'a ReferenceGraph,
) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
    let ids: BTreeSet<&str> = resource_ids.iter().map(String::as_str).collect();
    ids.iter()
        .map(|&id| {
            let deps = graph
                .dependencies(id)
                .filter(|target| *target != id && ids.contains(target))
                .collect();
            (id, deps)
        })
        .collect()
}

/// Order resources so dependencies come first.
/// Uses Kahn's algorithm with alphabetical tie-breaking for determinism.
/// Never fails: unresolvable nodes are appended alphabetically.
pub fn build_resource_order(resource_ids: &[String], graph: &ReferenceGraph) -> Vec<String> {
    let deps = resource_dependencies(resource_ids, graph);

    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
    for (&id, targets) in &deps {
        in_degree.insert(id, targets.len());
        for &target in targets {
            dependents.entry(target).or_default().push(id);
        }
    }

    // BTreeSet keeps the ready queue sorted before every extraction
    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();
    in_degree.retain(|_, d| *d > 0);

    let mut order = Vec::with_capacity(deps.len());
    while let Some(current) = ready.pop_first() {
        order.push(current.to_string());

        for &dependent in dependents.get(current).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    in_degree.remove(dependent);
                    ready.insert(dependent);
                }
            }
        }
    }

    if !in_degree.is_empty() {
        tracing::debug!(
            unresolved = in_degree.len(),
            "dependency cycle; appending remaining resources alphabetically"
        );
        order.extend(in_degree.keys().map(|id| id.to_string()));
    }

    order
}

/// Order the resources of a template.
pub fn resource_order(template: &Template, graph: &ReferenceGraph) -> Vec<String> {
    let ids: Vec<String> = template.resources.keys().cloned().collect();
    build_resource_order(&ids, graph)
}

/// Strongly connected components with more than one member (Tarjan).
/// Members are sorted; components are sorted by their first member.
pub fn find_cycles(resource_ids: &[String], graph: &ReferenceGraph) -> Vec<Vec<String>> {
    struct Tarjan<'a> {
        deps: &'a BTreeMap<&'a str, BTreeSet<&'a str>>,
        counter: usize,
        index: HashMap<&'a str, usize>,
        lowlink: HashMap<&'a str, usize>,
        stack: Vec<&'a str>,
        on_stack: BTreeSet<&'a str>,
        components: Vec<Vec<String>>,
    }

    impl<'a> Tarjan<'a> {
        fn visit(&mut self, node: &'a str) {
            self.index.insert(node, self.counter);
            self.lowlink.insert(node, self.counter);
            self.counter += 1;
            self.stack.push(node);
            self.on_stack.insert(node);

            let successors: Vec<&'a str> = self
                .deps
                .get(node)
                .map(|s| s.iter().copied().collect())
                .unwrap_or_default();
            for next in successors {
                if !self.index.contains_key(next) {
                    self.visit(next);
                    let low = self.lowlink[node].min(self.lowlink[next]);
                    self.lowlink.insert(node, low);
                } else if self.on_stack.contains(next) {
                    let low = self.lowlink[node].min(self.index[next]);
                    self.lowlink.insert(node, low);
                }
            }

            if self.lowlink[node] == self.index[node] {
                let mut component = Vec::new();
                while let Some(member) = self.stack.pop() {
                    self.on_stack.remove(member);
                    component.push(member.to_string());
                    if member == node {
                        break;
                    }
                }
                if component.len() > 1 {
                    component.sort();
                    self.components.push(component);
                }
            }
        }
    }

    let deps = resource_dependencies(resource_ids, graph);
    let mut tarjan = Tarjan {
        deps: &deps,
        counter: 0,
        index: HashMap::new(),
        lowlink: HashMap::new(),
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
        components: Vec::new(),
    };
    for &node in deps.keys() {
        if !tarjan.index.contains_key(node) {
            tarjan.visit(node);
        }
    }

    let mut components = tarjan.components;
    components.sort();
    components
}

/// Like [`build_resource_order`], but a dependency cycle is an error.
pub fn strict_resource_order(
    resource_ids: &[String],
    graph: &ReferenceGraph,
) -> Result<Vec<String>, ImportError> {
    let cycles = find_cycles(resource_ids, graph);
    if !cycles.is_empty() {
        let mut members: Vec<String> = cycles.into_iter().flatten().collect();
        members.sort();
        return Err(ImportError::Cycle(members));
    }
    Ok(build_resource_order(resource_ids, graph))
}
