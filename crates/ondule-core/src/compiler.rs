//! Graph compiler: linearizes a set of connected objects.
//!
//! Objects are wired by port links, not by an explicit edge list, and the
//! wiring may contain feedback loops. [`GraphCompiler::compile`] recovers the
//! edges, sorts the objects so every producer runs before its consumers, and
//! breaks feedback loops where they point most strongly backward.
//!
//! # Algorithm
//!
//! 1. **Orient.** Each inlet whose upstream outlet belongs to another object in
//!    the set yields an edge `producer → consumer`. Duplicate edges collapse;
//!    links to objects outside the set and self-links are ignored, since
//!    neither constrains the order.
//! 2. **Distances.** A breadth-first walk from the roots labels every
//!    reachable object with its hop distance. Roots are the objects flagged
//!    as unit inputs, else the objects with no in-set producer, else the
//!    first object.
//! 3. **Kahn's sort.** Ready objects are placed smallest input position
//!    first, so the order is deterministic and follows insertion order where
//!    the topology allows.
//! 4. **Breaking.** When nothing is ready, the remaining edge with the largest
//!    `distance(producer) − distance(consumer)` is removed (first found on
//!    ties) and sorting resumes. The consumer then reads the producer's
//!    previous frame. Remaining objects the first walk never reached get a
//!    fresh walk before scoring.
//!
//! Anything still unplaced when the break budget runs out is reported in
//! [`Compilation::unresolved`], never dropped.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use crate::object::{Object, ObjectId};

/// Result of compiling a set of objects.
#[derive(Debug, Default, Clone)]
pub struct Compilation {
    /// Objects in execution order.
    pub order: Vec<Arc<Object>>,
    /// Objects that could not be placed.
    pub unresolved: Vec<Arc<Object>>,
    /// Edges removed to break feedback loops, as `(producer, consumer)`.
    pub broken_edges: Vec<(ObjectId, ObjectId)>,
}

impl Compilation {
    /// True when every object was placed.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Ids of the ordered objects.
    pub fn order_ids(&self) -> Vec<ObjectId> {
        self.order.iter().map(|o| o.id()).collect()
    }
}

/// Orders objects for execution.
#[derive(Debug, Clone, Default)]
pub struct GraphCompiler {
    max_breaks: Option<usize>,
}

impl GraphCompiler {
    /// Creates a compiler that breaks as many edges as needed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits how many feedback edges one compile may break.
    pub fn with_break_limit(limit: usize) -> Self {
        Self {
            max_breaks: Some(limit),
        }
    }

    /// Compiles `objects` into an execution order.
    ///
    /// Every object's [`Processor::compile`](crate::Processor::compile) hook
    /// runs first. An object listed twice is compiled once, at its first
    /// position.
    pub fn compile(&self, objects: &[Arc<Object>]) -> Compilation {
        let mut nodes: Vec<&Arc<Object>> = Vec::with_capacity(objects.len());
        let mut index: HashMap<ObjectId, usize> = HashMap::with_capacity(objects.len());
        for object in objects {
            if !index.contains_key(&object.id()) {
                index.insert(object.id(), nodes.len());
                nodes.push(object);
            }
        }
        let n = nodes.len();
        if n == 0 {
            return Compilation::default();
        }

        for object in &nodes {
            object.compile();
        }

        let mut successors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut indegree = vec![0usize; n];
        for (consumer, object) in nodes.iter().enumerate() {
            for producer_id in object.upstream_ids() {
                let Some(&producer) = index.get(&producer_id) else {
                    continue;
                };
                if producer != consumer && successors[producer].insert(consumer) {
                    indegree[consumer] += 1;
                }
            }
        }

        let mut roots: Vec<usize> = (0..n).filter(|&i| nodes[i].is_unit_input()).collect();
        if roots.is_empty() {
            roots = (0..n).filter(|&i| indegree[i] == 0).collect();
        }
        if roots.is_empty() {
            roots.push(0);
        }
        let mut distance: Vec<Option<u32>> = vec![None; n];
        walk(&successors, &roots, &mut distance, &[]);

        let mut placed = vec![false; n];
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut result = Compilation {
            order: Vec::with_capacity(n),
            ..Compilation::default()
        };

        while result.order.len() < n {
            if let Some(u) = ready.pop_first() {
                placed[u] = true;
                result.order.push(Arc::clone(nodes[u]));
                for &v in &successors[u] {
                    indegree[v] -= 1;
                    if indegree[v] == 0 {
                        ready.insert(v);
                    }
                }
                continue;
            }

            if self
                .max_breaks
                .is_some_and(|limit| result.broken_edges.len() >= limit)
            {
                break;
            }

            while let Some(first) = (0..n).find(|&i| !placed[i] && distance[i].is_none()) {
                walk(&successors, &[first], &mut distance, &placed);
            }

            let Some((u, v)) = most_backward_edge(&successors, &placed, &distance) else {
                break;
            };
            successors[u].remove(&v);
            indegree[v] -= 1;
            if indegree[v] == 0 {
                ready.insert(v);
            }
            result.broken_edges.push((nodes[u].id(), nodes[v].id()));
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "compile: broke feedback edge {} → {}",
                nodes[u].name(),
                nodes[v].name()
            );
        }

        result.unresolved = (0..n)
            .filter(|&i| !placed[i])
            .map(|i| Arc::clone(nodes[i]))
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "compile: {} placed, {} unresolved, {} edges broken",
            result.order.len(),
            result.unresolved.len(),
            result.broken_edges.len()
        );

        result
    }
}

/// Breadth-first walk from `roots`, labeling unlabeled nodes with hop counts.
/// Nodes flagged in `skip` are not entered.
fn walk(
    successors: &[BTreeSet<usize>],
    roots: &[usize],
    distance: &mut [Option<u32>],
    skip: &[bool],
) {
    let skipped = |i: usize| skip.get(i).copied().unwrap_or(false);
    let mut queue = VecDeque::new();
    for &root in roots {
        if distance[root].is_none() && !skipped(root) {
            distance[root] = Some(0);
            queue.push_back(root);
        }
    }
    while let Some(u) = queue.pop_front() {
        let next = distance[u].map_or(0, |d| d + 1);
        for &v in &successors[u] {
            if distance[v].is_none() && !skipped(v) {
                distance[v] = Some(next);
                queue.push_back(v);
            }
        }
    }
}

/// The unplaced edge with the largest distance drop, first found on ties.
fn most_backward_edge(
    successors: &[BTreeSet<usize>],
    placed: &[bool],
    distance: &[Option<u32>],
) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), i64)> = None;
    for (u, targets) in successors.iter().enumerate() {
        if placed[u] {
            continue;
        }
        for &v in targets {
            if placed[v] {
                continue;
            }
            let du = i64::from(distance[u].unwrap_or(0));
            let dv = i64::from(distance[v].unwrap_or(0));
            let score = du - dv;
            if best.is_none_or(|(_, s)| score > s) {
                best = Some(((u, v), score));
            }
        }
    }
    best.map(|(edge, _)| edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AudioContext;
    use crate::object::{ObjectIo, connect};

    fn node(ctx: &AudioContext, name: &str) -> Arc<Object> {
        Object::builder(name, ctx)
            .inlet("In")
            .inlet("Aux")
            .outlet("Out")
            .build(|_: &ObjectIo<'_>| {})
    }

    fn names(objects: &[Arc<Object>]) -> Vec<&str> {
        objects.iter().map(|o| o.name()).collect()
    }

    #[test]
    fn empty_set_compiles_to_nothing() {
        let c = GraphCompiler::new().compile(&[]);
        assert!(c.order.is_empty());
        assert!(c.is_complete());
    }

    #[test]
    fn chain_is_ordered_regardless_of_input_order() {
        let ctx = AudioContext::with_defaults();
        let a = node(&ctx, "a");
        let b = node(&ctx, "b");
        let c = node(&ctx, "c");
        connect(&a, "Out", &b, "In").unwrap();
        connect(&b, "Out", &c, "In").unwrap();

        let result = GraphCompiler::new().compile(&[c.clone(), a.clone(), b.clone()]);
        assert_eq!(names(&result.order), vec!["a", "b", "c"]);
        assert!(result.broken_edges.is_empty());
    }

    #[test]
    fn independent_objects_keep_input_order() {
        let ctx = AudioContext::with_defaults();
        let x = node(&ctx, "x");
        let y = node(&ctx, "y");
        let z = node(&ctx, "z");
        let result = GraphCompiler::new().compile(&[y.clone(), z.clone(), x.clone()]);
        assert_eq!(names(&result.order), vec!["y", "z", "x"]);
    }

    #[test]
    fn diamond_places_join_last() {
        let ctx = AudioContext::with_defaults();
        let src = node(&ctx, "src");
        let left = node(&ctx, "left");
        let right = node(&ctx, "right");
        let join = node(&ctx, "join");
        connect(&src, "Out", &left, "In").unwrap();
        connect(&src, "Out", &right, "In").unwrap();
        connect(&left, "Out", &join, "In").unwrap();
        connect(&right, "Out", &join, "Aux").unwrap();

        let result = GraphCompiler::new().compile(&[
            join.clone(),
            right.clone(),
            left.clone(),
            src.clone(),
        ]);
        assert_eq!(names(&result.order), vec!["src", "right", "left", "join"]);
    }

    #[test]
    fn three_cycle_breaks_the_back_edge() {
        let ctx = AudioContext::with_defaults();
        let a = Object::builder("a", &ctx)
            .inlet("In")
            .outlet("Out")
            .unit_input()
            .build(|_: &ObjectIo<'_>| {});
        let b = node(&ctx, "b");
        let c = node(&ctx, "c");
        connect(&a, "Out", &b, "In").unwrap();
        connect(&b, "Out", &c, "In").unwrap();
        connect(&c, "Out", &a, "In").unwrap();

        let result = GraphCompiler::new().compile(&[a.clone(), b.clone(), c.clone()]);
        assert!(result.is_complete());
        assert_eq!(names(&result.order), vec!["a", "b", "c"]);
        assert_eq!(result.broken_edges, vec![(c.id(), a.id())]);
    }

    #[test]
    fn cycle_without_roots_still_resolves() {
        let ctx = AudioContext::with_defaults();
        let a = node(&ctx, "a");
        let b = node(&ctx, "b");
        connect(&a, "Out", &b, "In").unwrap();
        connect(&b, "Out", &a, "In").unwrap();

        let result = GraphCompiler::new().compile(&[a.clone(), b.clone()]);
        assert!(result.is_complete());
        assert_eq!(result.order.len(), 2);
        assert_eq!(result.broken_edges.len(), 1);
    }

    #[test]
    fn self_feedback_does_not_block() {
        let ctx = AudioContext::with_defaults();
        let a = node(&ctx, "a");
        connect(&a, "Out", &a, "Aux").unwrap();
        let result = GraphCompiler::new().compile(&[a.clone()]);
        assert_eq!(names(&result.order), vec!["a"]);
        assert!(result.broken_edges.is_empty());
    }

    #[test]
    fn external_links_are_ignored() {
        let ctx = AudioContext::with_defaults();
        let outside = node(&ctx, "outside");
        let a = node(&ctx, "a");
        let b = node(&ctx, "b");
        connect(&outside, "Out", &b, "In").unwrap();
        connect(&b, "Out", &a, "In").unwrap();

        let result = GraphCompiler::new().compile(&[a.clone(), b.clone()]);
        assert_eq!(names(&result.order), vec!["b", "a"]);
    }

    #[test]
    fn break_limit_reports_unresolved() {
        let ctx = AudioContext::with_defaults();
        let a = node(&ctx, "a");
        let b = node(&ctx, "b");
        let tail = node(&ctx, "tail");
        connect(&a, "Out", &b, "In").unwrap();
        connect(&b, "Out", &a, "In").unwrap();
        connect(&b, "Out", &tail, "In").unwrap();

        let result = GraphCompiler::with_break_limit(0).compile(&[a.clone(), b.clone(), tail.clone()]);
        assert!(!result.is_complete());
        assert!(result.order.is_empty());
        assert_eq!(names(&result.unresolved), vec!["a", "b", "tail"]);
    }

    #[test]
    fn duplicate_objects_compile_once() {
        let ctx = AudioContext::with_defaults();
        let a = node(&ctx, "a");
        let result = GraphCompiler::new().compile(&[a.clone(), a.clone()]);
        assert_eq!(result.order.len(), 1);
    }

    #[test]
    fn repeated_compiles_agree() {
        let ctx = AudioContext::with_defaults();
        let objs: Vec<_> = (0..5).map(|i| node(&ctx, &format!("n{i}"))).collect();
        connect(&objs[0], "Out", &objs[2], "In").unwrap();
        connect(&objs[2], "Out", &objs[4], "In").unwrap();
        connect(&objs[4], "Out", &objs[1], "Aux").unwrap();
        connect(&objs[1], "Out", &objs[2], "Aux").unwrap();
        connect(&objs[3], "Out", &objs[4], "Aux").unwrap();

        let compiler = GraphCompiler::new();
        let first = compiler.compile(&objs);
        let second = compiler.compile(&objs);
        assert_eq!(first.order_ids(), second.order_ids());
        assert_eq!(first.broken_edges, second.broken_edges);
        assert!(first.is_complete());
    }
}
