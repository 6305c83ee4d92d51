//! Matcher compilation.
//!
//! # Responsibilities
//! - Render the decision tree (plus the static lookup) into a structured
//!   procedure
//! - Terminate every guarded block with an explicit rejection
//! - Compile the procedure into nested closures
//!
//! # Design Decisions
//! - The procedure is plain data so it can be inspected without compiling
//! - A guarded block that is entered never falls back to its siblings; a
//!   near miss is a full miss
//! - Captures borrow from the request path, nothing is allocated while
//!   matching apart from the basket itself

use std::collections::HashMap;
use std::fmt;

use crate::routing::route::RouteId;
use crate::routing::tree::{Arity, Branch, DecisionTree, Guard, Next};

/// Static routes keyed by their joined parts.
pub type StaticTable = HashMap<String, RouteId>;

/// A request path split into segments.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    path: &'a str,
    parts: Vec<&'a str>,
    starts: Vec<usize>,
}

impl<'a> Segments<'a> {
    /// Split a path whose leading delimiter was already removed.
    pub fn split(path: &'a str, delimiter: char) -> Self {
        let mut parts = Vec::new();
        let mut starts = Vec::new();
        let mut offset = 0;
        for part in path.split(delimiter) {
            parts.push(part);
            starts.push(offset);
            offset += part.len() + delimiter.len_utf8();
        }
        Self { path, parts, starts }
    }

    pub fn path(&self) -> &'a str {
        self.path
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.parts.get(index).copied()
    }

    /// Everything from segment `index` to the end of the path.
    pub fn rest(&self, index: usize) -> Option<&'a str> {
        self.starts.get(index).map(|&start| &self.path[start..])
    }
}

/// Raw captures gathered while traversing, keyed by segment position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Basket<'a> {
    captures: Vec<(usize, &'a str)>,
}

impl<'a> Basket<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, index: usize, raw: &'a str) {
        self.captures.push((index, raw));
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.captures
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, raw)| *raw)
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }
}

/// One statement of the matching procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Return the static route for the whole path, if there is one.
    StaticLookup,
    /// Enter `body` when the segment count satisfies `arity`.
    IfCount { arity: Arity, body: Vec<Stmt> },
    /// Enter `body` when segment `index` passes `guard`.
    IfSegment {
        index: usize,
        guard: Guard,
        body: Vec<Stmt>,
    },
    /// Reject unless segment `index` passes `guard`.
    Require { index: usize, guard: Guard },
    /// Put segment `index` in the basket.
    Capture { index: usize },
    /// Put everything from segment `index` onward in the basket.
    CaptureRest { index: usize },
    Return(RouteId),
    Reject,
}

impl Stmt {
    fn is_terminal(&self) -> bool {
        matches!(self, Stmt::Return(_) | Stmt::Reject)
    }
}

/// The logical matching procedure, before or after compilation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Procedure {
    body: Vec<Stmt>,
    labels: HashMap<RouteId, String>,
}

impl Procedure {
    /// Render the static lookup and the tree into statements.
    pub fn render(has_static: bool, tree: &DecisionTree, labels: HashMap<RouteId, String>) -> Self {
        let mut body = Vec::new();
        if has_static {
            body.push(Stmt::StaticLookup);
        }
        for group in tree.groups.iter().chain(tree.open.as_ref()) {
            body.push(Stmt::IfCount {
                arity: group.arity,
                body: group.branches.iter().map(render_branch).collect(),
            });
        }
        Self { body, labels }
    }

    /// Fast-fail pass: every block that can run off its end without a
    /// terminal gets an explicit `Reject`, at every nesting level.
    pub fn optimize(&mut self) {
        terminate(&mut self.body);
    }

    /// True when no guarded block can fall through to its enclosing scope.
    pub fn is_fast_fail(&self) -> bool {
        fn check(block: &[Stmt]) -> bool {
            block.last().is_some_and(Stmt::is_terminal)
                && block.iter().all(|stmt| match stmt {
                    Stmt::IfCount { body, .. } | Stmt::IfSegment { body, .. } => check(body),
                    _ => true,
                })
        }
        check(&self.body)
    }

    pub fn body(&self) -> &[Stmt] {
        &self.body
    }

    /// Turn the procedure into an executable matcher.
    pub fn compile(&self) -> Matcher {
        debug_assert!(self.is_fast_fail(), "procedure compiled before optimize()");
        Matcher {
            root: compile_block(&self.body),
        }
    }

    fn write_block(&self, f: &mut fmt::Formatter<'_>, block: &[Stmt], depth: usize) -> fmt::Result {
        let pad = "    ".repeat(depth);
        for stmt in block {
            match stmt {
                Stmt::StaticLookup => {
                    writeln!(f, "{pad}if path in static_routes:")?;
                    writeln!(f, "{pad}    return static_routes[path]")?;
                }
                Stmt::IfCount { arity, body } => {
                    writeln!(f, "{pad}if {arity}:")?;
                    self.write_block(f, body, depth + 1)?;
                }
                Stmt::IfSegment { index, guard, body } => {
                    writeln!(f, "{pad}if parts[{index}] {guard}:")?;
                    self.write_block(f, body, depth + 1)?;
                }
                Stmt::Require { index, guard } => {
                    writeln!(f, "{pad}require parts[{index}] {guard}")?;
                }
                Stmt::Capture { index } => writeln!(f, "{pad}basket[{index}] = parts[{index}]")?,
                Stmt::CaptureRest { index } => writeln!(f, "{pad}basket[{index}] = parts[{index}..]")?,
                Stmt::Return(id) => match self.labels.get(id) {
                    Some(label) => writeln!(f, "{pad}return {id}  # {label}")?,
                    None => writeln!(f, "{pad}return {id}")?,
                },
                Stmt::Reject => writeln!(f, "{pad}reject")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "find_route(path, parts, basket):")?;
        writeln!(f, "    num = len(parts)")?;
        self.write_block(f, &self.body, 1)
    }
}

fn render_branch(branch: &Branch) -> Stmt {
    let mut body = Vec::new();
    push_capture(&mut body, branch.index, &branch.guard);
    for (offset, guard) in branch.tail.iter().enumerate() {
        let index = branch.index + 1 + offset;
        body.push(Stmt::Require {
            index,
            guard: guard.clone(),
        });
        push_capture(&mut body, index, guard);
    }
    match &branch.next {
        Next::Leaf(id) => body.push(Stmt::Return(*id)),
        Next::Children(children) => body.extend(children.iter().map(render_branch)),
    }
    Stmt::IfSegment {
        index: branch.index,
        guard: branch.guard.clone(),
        body,
    }
}

fn push_capture(body: &mut Vec<Stmt>, index: usize, guard: &Guard) {
    match guard {
        Guard::Literal(_) => {}
        Guard::Typed(_) => body.push(Stmt::Capture { index }),
        Guard::Remainder => body.push(Stmt::CaptureRest { index }),
    }
}

fn terminate(block: &mut Vec<Stmt>) {
    for stmt in block.iter_mut() {
        if let Stmt::IfCount { body, .. } | Stmt::IfSegment { body, .. } = stmt {
            terminate(body);
        }
    }
    if !block.last().is_some_and(Stmt::is_terminal) {
        block.push(Stmt::Reject);
    }
}

/// Control signal threaded through compiled steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Return(RouteId),
    Reject,
}

type Step = Box<dyn for<'a> Fn(&Segments<'a>, &StaticTable, &mut Basket<'a>) -> Flow + Send + Sync>;

/// Executable form of a [`Procedure`].
pub struct Matcher {
    root: Step,
}

impl Matcher {
    /// Find the route for `segments`, with its raw captures.
    pub fn find<'a>(&self, segments: &Segments<'a>, statics: &StaticTable) -> Option<(RouteId, Basket<'a>)> {
        let mut basket = Basket::new();
        match (self.root)(segments, statics, &mut basket) {
            Flow::Return(id) => Some((id, basket)),
            Flow::Continue | Flow::Reject => None,
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Matcher")
    }
}

fn compile_block(block: &[Stmt]) -> Step {
    let steps: Vec<Step> = block.iter().map(compile_stmt).collect();
    Box::new(move |segments, statics, basket| {
        for step in &steps {
            match step(segments, statics, basket) {
                Flow::Continue => {}
                flow => return flow,
            }
        }
        Flow::Continue
    })
}

fn compile_stmt(stmt: &Stmt) -> Step {
    match stmt {
        Stmt::StaticLookup => Box::new(|segments, statics, _| match statics.get(segments.path()) {
            Some(id) => Flow::Return(*id),
            None => Flow::Continue,
        }),
        Stmt::IfCount { arity, body } => {
            let arity = *arity;
            let body = compile_block(body);
            Box::new(move |segments, statics, basket| {
                if arity.admits(segments.len()) {
                    body(segments, statics, basket)
                } else {
                    Flow::Continue
                }
            })
        }
        Stmt::IfSegment { index, guard, body } => {
            let (index, guard) = (*index, guard.clone());
            let body = compile_block(body);
            Box::new(move |segments, statics, basket| {
                if guard.test(segments.get(index)) {
                    body(segments, statics, basket)
                } else {
                    Flow::Continue
                }
            })
        }
        Stmt::Require { index, guard } => {
            let (index, guard) = (*index, guard.clone());
            Box::new(move |segments, _, _| {
                if guard.test(segments.get(index)) {
                    Flow::Continue
                } else {
                    Flow::Reject
                }
            })
        }
        Stmt::Capture { index } => {
            let index = *index;
            Box::new(move |segments, _, basket| {
                if let Some(raw) = segments.get(index) {
                    basket.push(index, raw);
                }
                Flow::Continue
            })
        }
        Stmt::CaptureRest { index } => {
            let index = *index;
            Box::new(move |segments, _, basket| {
                if let Some(raw) = segments.rest(index) {
                    basket.push(index, raw);
                }
                Flow::Continue
            })
        }
        Stmt::Return(id) => {
            let id = *id;
            Box::new(move |_, _, _| Flow::Return(id))
        }
        Stmt::Reject => Box::new(|_, _, _| Flow::Reject),
    }
}
