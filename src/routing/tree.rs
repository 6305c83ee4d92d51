//! Decision tree over dynamic routes.
//!
//! # Responsibilities
//! - Group dynamic routes by segment count
//! - Merge routes sharing a literal or a typed guard at the same position
//! - Order siblings: literals, then typed guards by specificity, then
//!   registration order
//! - Collapse single-child chains after generation
//!
//! # Design Decisions
//! - Wildcard routes are copied into every exact group long enough to hold
//!   them, plus one open group for counts with no exact group, so a request
//!   only ever enters one group
//! - A collapsed chain keeps commit semantics: its first guard decides
//!   whether the branch is entered, later guards reject on failure

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;

use crate::routing::params::ParamKind;
use crate::routing::pattern::{Pattern, Segment};
use crate::routing::route::RouteId;

/// Test applied to the segment at a branch position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Guard {
    /// Segment equals the text.
    Literal(String),
    /// Segment passes the type's syntactic check.
    Typed(ParamKind),
    /// Every remaining segment; the first must be non-empty.
    Remainder,
}

impl Guard {
    fn from_segment(segment: &Segment) -> Self {
        match segment {
            Segment::Literal(text) => Guard::Literal(text.clone()),
            Segment::Param { kind, .. } if kind.is_wildcard() => Guard::Remainder,
            Segment::Param { kind, .. } => Guard::Typed(kind.clone()),
        }
    }

    /// Sibling ordering weight; literals always outrank typed guards.
    pub fn rank(&self) -> u8 {
        match self {
            Guard::Literal(_) => u8::MAX,
            Guard::Typed(kind) => kind.specificity(),
            Guard::Remainder => ParamKind::Path.specificity(),
        }
    }

    /// Whether this position feeds the capture basket.
    pub fn captures(&self) -> bool {
        !matches!(self, Guard::Literal(_))
    }

    pub fn test(&self, segment: Option<&str>) -> bool {
        match (self, segment) {
            (Guard::Literal(text), Some(segment)) => text == segment,
            (Guard::Typed(kind), Some(segment)) => kind.accepts(segment),
            (Guard::Remainder, Some(segment)) => !segment.is_empty(),
            (_, None) => false,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Literal(text) => write!(f, "== {text:?}"),
            Guard::Typed(kind) => write!(f, "is {kind}"),
            Guard::Remainder => f.write_str("is path"),
        }
    }
}

/// Segment-count condition of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn admits(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "num == {n}"),
            Arity::AtLeast(n) => write!(f, "num >= {n}"),
        }
    }
}

/// What follows a branch once its guards pass.
#[derive(Debug, Clone)]
pub enum Next {
    Leaf(RouteId),
    Children(Vec<Branch>),
}

#[derive(Debug, Clone)]
pub struct Branch {
    /// Position of `guard`; tail guards follow at consecutive positions.
    pub index: usize,
    pub guard: Guard,
    /// Continuation guards folded in by [`DecisionTree::finalize`].
    pub tail: Vec<Guard>,
    pub next: Next,
}

impl Branch {
    fn depth(&self) -> usize {
        1 + match &self.next {
            Next::Leaf(_) => 0,
            Next::Children(children) => children.iter().map(Branch::depth).max().unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Group {
    pub arity: Arity,
    pub branches: Vec<Branch>,
}

/// Branch hierarchy for all dynamic routes.
#[derive(Debug, Clone, Default)]
pub struct DecisionTree {
    /// Exact-count groups, ascending by count.
    pub groups: Vec<Group>,
    /// Used only for counts with no exact group.
    pub open: Option<Group>,
    /// Routes shadowed by an earlier route with identical guards.
    pub shadowed: Vec<RouteId>,
}

impl DecisionTree {
    /// Build from dynamic routes in registration order.
    pub fn generate<'a, I>(routes: I) -> Self
    where
        I: IntoIterator<Item = (RouteId, &'a Pattern)>,
    {
        let routes: Vec<(RouteId, &Pattern)> = routes.into_iter().collect();

        let counts: BTreeSet<usize> = routes
            .iter()
            .filter(|(_, pattern)| pattern.wildcard_at().is_none())
            .map(|(_, pattern)| pattern.len())
            .collect();
        let open_min = routes
            .iter()
            .filter_map(|(_, pattern)| pattern.wildcard_at())
            .min()
            .map(|fixed| fixed + 1);

        let mut tree = DecisionTree::default();
        let mut shadowed = BTreeSet::new();

        for count in counts {
            let mut branches = Vec::new();
            for (id, pattern) in &routes {
                let guards: Vec<Guard> = match pattern.wildcard_at() {
                    None if pattern.len() == count => {
                        pattern.segments().iter().map(Guard::from_segment).collect()
                    }
                    Some(fixed) if fixed < count => {
                        pattern.segments().iter().map(Guard::from_segment).collect()
                    }
                    _ => continue,
                };
                if !insert(&mut branches, &guards, 0, *id) {
                    shadowed.insert(*id);
                }
            }
            tree.groups.push(Group {
                arity: Arity::Exact(count),
                branches,
            });
        }

        if let Some(min) = open_min {
            let mut branches = Vec::new();
            for (id, pattern) in &routes {
                if pattern.wildcard_at().is_some() {
                    let guards: Vec<Guard> = pattern.segments().iter().map(Guard::from_segment).collect();
                    if !insert(&mut branches, &guards, 0, *id) {
                        shadowed.insert(*id);
                    }
                }
            }
            tree.open = Some(Group {
                arity: Arity::AtLeast(min),
                branches,
            });
        }

        for group in tree.groups.iter_mut().chain(tree.open.as_mut()) {
            sort_branches(&mut group.branches);
        }

        tree.shadowed = shadowed.into_iter().collect();
        for id in &tree.shadowed {
            tracing::warn!(route = %id, "Route is shadowed by an earlier route with identical guards");
        }

        tree
    }

    /// Collapse single-child chains into their parent.
    pub fn finalize(&mut self) {
        for group in self.groups.iter_mut().chain(self.open.as_mut()) {
            for branch in &mut group.branches {
                collapse(branch);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.open.is_none()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len() + usize::from(self.open.is_some())
    }

    /// Deepest branch nesting across all groups.
    pub fn depth(&self) -> usize {
        self.groups
            .iter()
            .chain(self.open.as_ref())
            .flat_map(|group| group.branches.iter().map(Branch::depth))
            .max()
            .unwrap_or(0)
    }
}

/// Returns false if the route's leaf was already taken.
fn insert(branches: &mut Vec<Branch>, guards: &[Guard], index: usize, route: RouteId) -> bool {
    let Some((guard, rest)) = guards.split_first() else {
        return false;
    };
    let is_leaf = rest.is_empty() || *guard == Guard::Remainder;

    let position = branches.iter().position(|b| b.guard == *guard);
    let branch = match position {
        Some(position) => &mut branches[position],
        None => {
            branches.push(Branch {
                index,
                guard: guard.clone(),
                tail: Vec::new(),
                next: if is_leaf {
                    Next::Leaf(route)
                } else {
                    Next::Children(Vec::new())
                },
            });
            if is_leaf {
                return true;
            }
            let last = branches.len() - 1;
            &mut branches[last]
        }
    };

    match (&mut branch.next, is_leaf) {
        (Next::Children(children), false) => insert(children, rest, index + 1, route),
        _ => false,
    }
}

fn sort_branches(branches: &mut [Branch]) {
    // Stable: equal ranks keep registration order.
    branches.sort_by_key(|branch| Reverse(branch.guard.rank()));
    for branch in branches.iter_mut() {
        if let Next::Children(children) = &mut branch.next {
            sort_branches(children);
        }
    }
}

fn collapse(branch: &mut Branch) {
    if let Next::Children(children) = &mut branch.next {
        for child in children.iter_mut() {
            collapse(child);
        }
    }

    let only_child = match &mut branch.next {
        Next::Children(children) if children.len() == 1 => children.pop(),
        _ => None,
    };
    if let Some(child) = only_child {
        branch.tail.push(child.guard);
        branch.tail.extend(child.tail);
        branch.next = child.next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(paths: &[&str]) -> Vec<Pattern> {
        paths.iter().map(|p| Pattern::parse(p, '/').unwrap()).collect()
    }

    fn build(patterns: &[Pattern]) -> DecisionTree {
        DecisionTree::generate(patterns.iter().enumerate().map(|(i, p)| (RouteId(i), p)))
    }

    #[test]
    fn test_groups_by_count() {
        let patterns = patterns(&["/a/<x>", "/b/<y>/c", "/d/<z>"]);
        let tree = build(&patterns);
        let arities: Vec<_> = tree.groups.iter().map(|g| g.arity).collect();
        assert_eq!(arities, vec![Arity::Exact(2), Arity::Exact(3)]);
        assert!(tree.open.is_none());
        assert_eq!(tree.groups[0].branches.len(), 2);
    }

    #[test]
    fn test_literal_before_typed() {
        let patterns = patterns(&["/<name>/x", "/<id:int>/x", "/fixed/<v>"]);
        let tree = build(&patterns);
        let guards: Vec<_> = tree.groups[0].branches.iter().map(|b| b.guard.clone()).collect();
        assert_eq!(
            guards,
            vec![
                Guard::Literal("fixed".into()),
                Guard::Typed(ParamKind::Int),
                Guard::Typed(ParamKind::Str),
            ]
        );
    }

    #[test]
    fn test_shared_guards_merge() {
        let patterns = patterns(&["/users/<id:int>", "/users/<uid:int>/posts", "/users/<name>"]);
        let tree = build(&patterns);
        assert_eq!(tree.groups.len(), 2);

        let two = &tree.groups[0].branches;
        assert_eq!(two.len(), 1);
        match &two[0].next {
            Next::Children(children) => assert_eq!(children.len(), 2),
            Next::Leaf(_) => panic!("expected children"),
        }
    }

    #[test]
    fn test_shadowed_route() {
        let patterns = patterns(&["/a/<x:int>", "/a/<y:int>"]);
        let tree = build(&patterns);
        assert_eq!(tree.shadowed, vec![RouteId(1)]);
    }

    #[test]
    fn test_wildcard_groups() {
        let patterns = patterns(&["/files/<id:int>", "/files/<rest:path>"]);
        let tree = build(&patterns);
        assert_eq!(tree.groups.len(), 1);
        assert_eq!(tree.open.as_ref().map(|g| g.arity), Some(Arity::AtLeast(2)));

        // The wildcard shares the exact group's "files" branch.
        match &tree.groups[0].branches[0].next {
            Next::Children(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[1].guard, Guard::Remainder);
            }
            Next::Leaf(_) => panic!("expected children"),
        }
    }

    #[test]
    fn test_collapse_chains() {
        let patterns = patterns(&["/api/v1/items/<id:int>"]);
        let mut tree = build(&patterns);
        assert_eq!(tree.depth(), 4);

        tree.finalize();
        assert_eq!(tree.depth(), 1);
        let branch = &tree.groups[0].branches[0];
        assert_eq!(branch.guard, Guard::Literal("api".into()));
        assert_eq!(branch.tail.len(), 3);
        assert!(matches!(branch.next, Next::Leaf(RouteId(0))));
    }

    #[test]
    fn test_guard_tests() {
        assert!(Guard::Literal("a".into()).test(Some("a")));
        assert!(!Guard::Literal("a".into()).test(None));
        assert!(Guard::Typed(ParamKind::Int).test(Some("12")));
        assert!(!Guard::Remainder.test(Some("")));
    }
}
