//! Join decorrelation.
//!
//! A `for` expression whose `where` clause compares paths rooted at two
//! independently ranged variables is a correlated nested loop. The rewrite
//! splits the ranges into two standalone sub-queries, one per side of the
//! comparison, joins them with a [`NodeKind::Join`] and ranges a single
//! tuple variable over the join result instead:
//!
//! ```text
//! for $x in A, $y in B where $x/k = $y/k return $x
//! ```
//!
//! becomes, schematically,
//!
//! ```text
//! for $tuple in join(for $x in A return <tuple><x>{$x}</x></tuple>,
//!                    for $y in B return <tuple><y>{$y}</y></tuple>,
//!                    $x/k, $y/k)
//! return $tuple/x/node()
//! ```
use std::collections::BTreeSet;

use ahash::HashSet;
use tracing::debug;

use crate::arena::Ast;
use crate::error::{Error, Result};
use crate::node::{EqualityKind, Glob, JoinVars, LogicOp, NodeId, NodeKind, Separator};

/// Decorrelate implicit joins in every `for` expression of the tree.
///
/// Returns the number of joins introduced. Running it again on its own
/// output is a no-op unless a remaining `where` clause still holds an
/// implicit join.
pub fn rewrite(ast: &mut Ast) -> Result<usize> {
    let Some(root) = ast.root() else {
        return Ok(0);
    };
    // work on a copy so a failed rewrite leaves `ast` untouched
    let mut work = ast.clone();
    let mut rewriter = Rewriter {
        ast: &mut work,
        garbage: Vec::new(),
        applied: 0,
    };
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if rewriter.ast.kind(id) == &NodeKind::FlwrExpression {
            rewriter.flwr(id)?;
        }
        // children are read after the rewrite so new sub-queries get visited
        stack.extend(rewriter.ast.children(id).iter().rev().copied());
    }
    let Rewriter {
        garbage, applied, ..
    } = rewriter;
    if !garbage.is_empty() {
        work.delete_many(&garbage)?;
    }
    *ast = work;
    Ok(applied)
}

/// Call `f` for every variable reference under `id` that is not bound
/// within the subtree or by a name in `bound`.
pub fn visit_free_variables(
    ast: &Ast,
    id: NodeId,
    bound: &mut Vec<String>,
    f: &mut impl FnMut(NodeId, &str),
) {
    match ast.kind(id) {
        NodeKind::Variable(name) => {
            if !bound.iter().any(|b| b == name) {
                f(id, name)
            }
        }
        NodeKind::FlwrExpression | NodeKind::LetExpression | NodeKind::SomeExpression => {
            let mark = bound.len();
            for &clause in ast.children(id) {
                match ast.kind(clause) {
                    NodeKind::ForClause | NodeKind::LetClause | NodeKind::SomeClause => {
                        // each definition sees the ones before it
                        for &def in ast.children(clause) {
                            for &range in ast.children(def) {
                                visit_free_variables(ast, range, bound, f);
                            }
                            if let Some(name) = ast.kind(def).binds() {
                                bound.push(name.to_string());
                            }
                        }
                    }
                    _ => visit_free_variables(ast, clause, bound, f),
                }
            }
            bound.truncate(mark);
        }
        NodeKind::Join(vars) => {
            let children = ast.children(id);
            for (i, &child) in children.iter().enumerate() {
                let key_var = match i {
                    2 => Some(&vars.left),
                    3 => Some(&vars.right),
                    _ => None,
                };
                if let Some(var) = key_var {
                    bound.push(var.clone());
                }
                visit_free_variables(ast, child, bound, f);
                if key_var.is_some() {
                    bound.pop();
                }
            }
        }
        _ => {
            for &child in ast.children(id) {
                visit_free_variables(ast, child, bound, f);
            }
        }
    }
}

/// Names of the variables referenced freely under `id`.
pub fn free_variables(ast: &Ast, id: NodeId) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    visit_free_variables(ast, id, &mut Vec::new(), &mut |_, name| {
        names.insert(name.to_string());
    });
    names
}

struct Rewriter<'a> {
    ast: &'a mut Ast,
    // detached subtrees, deleted in one compaction at the end
    garbage: Vec<NodeId>,
    applied: usize,
}

struct Range {
    name: String,
    def: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Outer,
    Left,
    Right,
}

impl Rewriter<'_> {
    fn flwr(&mut self, flwr: NodeId) -> Result<()> {
        let Some(where_clause) = self
            .ast
            .find_child(flwr, |kind| kind == &NodeKind::WhereClause)
        else {
            return Ok(());
        };
        let for_clause = self
            .ast
            .find_child(flwr, |kind| kind == &NodeKind::ForClause)
            .ok_or(Error::InvalidNode(flwr))?;

        let ranges = self
            .ast
            .children(for_clause)
            .iter()
            .filter_map(|&def| {
                self.ast.kind(def).binds().map(|name| Range {
                    name: name.to_string(),
                    def,
                })
            })
            .collect::<Vec<_>>();
        let distinct = ranges.iter().map(|r| &r.name).collect::<HashSet<_>>();
        if distinct.len() != ranges.len() {
            debug!(flwr = %flwr, "join rewrite skipped: a variable is ranged twice");
            return Ok(());
        }
        let dependencies = self.dependency_sets(&ranges);

        let mut candidates = Vec::new();
        self.candidates(self.ast.children(where_clause)[0], &mut candidates);
        for eq in candidates {
            let operands = self.ast.children(eq);
            let (left_key, right_key) = (operands[0], operands[1]);
            let (Some(left), Some(right)) =
                (self.key_variable(left_key), self.key_variable(right_key))
            else {
                continue;
            };
            if left == right {
                continue;
            }
            let position = |name: &str| ranges.iter().position(|r| r.name == name);
            let (Some(l), Some(r)) = (position(&left), position(&right)) else {
                debug!(%left, %right, "join candidate skipped: not both ranged by this `for`");
                continue;
            };
            if !dependencies[l].is_disjoint(&dependencies[r]) {
                debug!(%left, %right, "join candidate skipped: ranges depend on each other");
                continue;
            }
            return self.apply(
                flwr,
                for_clause,
                where_clause,
                eq,
                &ranges,
                (&left, &dependencies[l]),
                (&right, &dependencies[r]),
            );
        }
        debug!(flwr = %flwr, "join rewrite skipped: no implicit join in `where`");
        Ok(())
    }

    // For each range, the indexes of the ranges it transitively depends
    // on, itself included.
    fn dependency_sets(&self, ranges: &[Range]) -> Vec<BTreeSet<usize>> {
        let mut sets: Vec<BTreeSet<usize>> = Vec::with_capacity(ranges.len());
        for (i, range) in ranges.iter().enumerate() {
            let mut set = BTreeSet::from([i]);
            for &expr in self.ast.children(range.def) {
                for name in free_variables(self.ast, expr) {
                    if let Some(j) = ranges[..i].iter().position(|r| r.name == name) {
                        set.extend(sets[j].iter().copied());
                    }
                }
            }
            sets.push(set);
        }
        sets
    }

    // Value equalities reachable from the predicate root through
    // parentheses and conjunctions, left to right.
    fn candidates(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.ast.kind(id) {
            NodeKind::Precedence | NodeKind::LogicOperator(LogicOp::And) => {
                for &child in self.ast.children(id) {
                    self.candidates(child, out);
                }
            }
            NodeKind::Equality(EqualityKind::Value) => out.push(id),
            _ => {}
        }
    }

    // The variable a join key is rooted at, if the key is a path that
    // mentions no other variable.
    fn key_variable(&self, key: NodeId) -> Option<String> {
        let mut id = key;
        let name = loop {
            match self.ast.kind(id) {
                NodeKind::Variable(name) => break name.clone(),
                NodeKind::PathSeparator(_) | NodeKind::Filter => id = self.ast.children(id)[0],
                _ => return None,
            }
        };
        let free = free_variables(self.ast, key);
        (free.len() == 1 && free.contains(&name)).then_some(name)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &mut self,
        flwr: NodeId,
        for_clause: NodeId,
        where_clause: NodeId,
        eq: NodeId,
        ranges: &[Range],
        (left, left_deps): (&str, &BTreeSet<usize>),
        (right, right_deps): (&str, &BTreeSet<usize>),
    ) -> Result<()> {
        // chosen while every name of the `for` is still in the tree
        let tuple = self.fresh_name("tuple");
        let placement = self.place_residual(flwr, where_clause, eq, ranges, left_deps, right_deps)?;

        let operands = self.ast.children(eq).to_vec();
        for &operand in &operands {
            self.ast.detach(operand)?;
        }
        self.excise(eq)?;

        // the `where` clause survives excision only if something else is left in it
        let has_residual = self.ast.parent(where_clause) == Some(flwr);
        let (left_residual, right_residual) = match placement {
            Placement::Left if has_residual => (Some(self.take_where(where_clause)?), None),
            Placement::Right if has_residual => (None, Some(self.take_where(where_clause)?)),
            _ => (None, None),
        };

        let insert_at = left_deps
            .iter()
            .chain(right_deps.iter())
            .copied()
            .min()
            .unwrap_or(0);
        for &i in left_deps.iter().chain(right_deps.iter()) {
            self.ast.detach(ranges[i].def)?;
        }
        let left_query = self.sub_query(ranges, left_deps, left_residual)?;
        let right_query = self.sub_query(ranges, right_deps, right_residual)?;
        let join = self.ast.add(
            NodeKind::Join(JoinVars {
                left: left.to_string(),
                right: right.to_string(),
            }),
            vec![left_query, right_query, operands[0], operands[1]],
        )?;
        let tuple_def = self.ast.add(NodeKind::VariableDef(tuple.clone()), vec![join])?;
        self.ast.insert_child(for_clause, insert_at, tuple_def)?;

        let moved = left_deps
            .iter()
            .chain(right_deps.iter())
            .map(|&i| ranges[i].name.clone())
            .collect::<HashSet<_>>();
        self.substitute(flwr, &moved, &tuple)?;

        self.applied += 1;
        debug!(%left, %right, %tuple, residual = ?placement, "rewrote implicit join");
        Ok(())
    }

    // Decide which side of the join the rest of the `where` predicate
    // belongs to, before anything is moved.
    fn place_residual(
        &self,
        flwr: NodeId,
        where_clause: NodeId,
        eq: NodeId,
        ranges: &[Range],
        left_deps: &BTreeSet<usize>,
        right_deps: &BTreeSet<usize>,
    ) -> Result<Placement> {
        let excised = self.ast.preorder(eq).into_iter().collect::<HashSet<_>>();
        let mut local = ranges.iter().map(|r| r.name.clone()).collect::<HashSet<_>>();
        if let Some(let_clause) = self
            .ast
            .find_child(flwr, |kind| kind == &NodeKind::LetClause)
        {
            for &def in self.ast.children(let_clause) {
                if let Some(name) = self.ast.kind(def).binds() {
                    local.insert(name.to_string());
                }
            }
        }
        let mut referenced = BTreeSet::new();
        let predicate = self.ast.children(where_clause)[0];
        visit_free_variables(self.ast, predicate, &mut Vec::new(), &mut |id, name| {
            if !excised.contains(&id) && local.contains(name) {
                referenced.insert(name.to_string());
            }
        });

        let names = |deps: &BTreeSet<usize>| {
            deps.iter()
                .map(|&i| ranges[i].name.clone())
                .collect::<BTreeSet<_>>()
        };
        let (left, right) = (names(left_deps), names(right_deps));
        if referenced.is_disjoint(&left) && referenced.is_disjoint(&right) {
            Ok(Placement::Outer)
        } else if referenced.is_subset(&left) {
            Ok(Placement::Left)
        } else if referenced.is_subset(&right) {
            Ok(Placement::Right)
        } else {
            let list = referenced
                .iter()
                .map(|name| format!("${}", name))
                .collect::<Vec<_>>()
                .join(", ");
            Err(Error::UnresolvableJoin(format!(
                "the rest of the `where` clause references {} and fits neither side",
                list
            )))
        }
    }

    // Remove an equality whose operands are already detached, together
    // with the parentheses around it.
    fn excise(&mut self, eq: NodeId) -> Result<()> {
        let mut node = eq;
        loop {
            let parent = self.ast.parent(node).ok_or(Error::InvalidNode(node))?;
            match self.ast.kind(parent) {
                NodeKind::Precedence => node = parent,
                NodeKind::LogicOperator(LogicOp::And) => {
                    let sibling = self
                        .ast
                        .children(parent)
                        .iter()
                        .copied()
                        .find(|&child| child != node)
                        .ok_or(Error::InvalidNode(parent))?;
                    self.ast.detach(node)?;
                    self.ast.detach(sibling)?;
                    self.ast.replace(parent, sibling)?;
                    self.garbage.extend([node, parent]);
                    return Ok(());
                }
                NodeKind::WhereClause => {
                    self.ast.detach(parent)?;
                    self.garbage.push(parent);
                    return Ok(());
                }
                _ => return Err(Error::InvalidNode(node)),
            }
        }
    }

    fn take_where(&mut self, where_clause: NodeId) -> Result<NodeId> {
        let predicate = self.ast.children(where_clause)[0];
        self.ast.detach(predicate)?;
        self.ast.detach(where_clause)?;
        self.garbage.push(where_clause);
        Ok(predicate)
    }

    // `for <moved ranges> where <residual> return <tuple><x>{$x}</x>...</tuple>`
    fn sub_query(
        &mut self,
        ranges: &[Range],
        deps: &BTreeSet<usize>,
        residual: Option<NodeId>,
    ) -> Result<NodeId> {
        let defs = deps.iter().map(|&i| ranges[i].def).collect();
        let for_clause = self.ast.add(NodeKind::ForClause, defs)?;
        let mut members: Option<NodeId> = None;
        for &i in deps {
            let name = &ranges[i].name;
            let var = self.ast.add(NodeKind::Variable(name.clone()), vec![])?;
            let member = self.ast.add(NodeKind::Tag(name.clone()), vec![var])?;
            members = Some(match members {
                Some(previous) => self.ast.add(NodeKind::Concatenation, vec![previous, member])?,
                None => member,
            });
        }
        let tuple = self
            .ast
            .add(NodeKind::Tag("tuple".to_string()), members.into_iter().collect())?;
        let return_clause = self.ast.add(NodeKind::ReturnClause, vec![tuple])?;
        let mut clauses = vec![for_clause];
        if let Some(residual) = residual {
            clauses.push(self.ast.add(NodeKind::WhereClause, vec![residual])?);
        }
        clauses.push(return_clause);
        self.ast.add(NodeKind::FlwrExpression, clauses)
    }

    // Point every free reference to a moved variable at its tuple member:
    // `$x` becomes `$tuple/x/node()`.
    fn substitute(&mut self, flwr: NodeId, moved: &HashSet<String>, tuple: &str) -> Result<()> {
        let mut targets = Vec::new();
        visit_free_variables(self.ast, flwr, &mut Vec::new(), &mut |id, name| {
            if moved.contains(name) {
                targets.push((id, name.to_string()));
            }
        });
        for (id, name) in targets {
            let tuple_var = self.ast.add(NodeKind::Variable(tuple.to_string()), vec![])?;
            let member = self.ast.add(NodeKind::TagName(name), vec![])?;
            let step = self.ast.add(
                NodeKind::PathSeparator(Separator::Child),
                vec![tuple_var, member],
            )?;
            let content = self.ast.add(NodeKind::PathGlobbing(Glob::Node), vec![])?;
            let path = self
                .ast
                .add(NodeKind::PathSeparator(Separator::Child), vec![step, content])?;
            self.ast.replace(id, path)?;
            self.garbage.push(id);
        }
        Ok(())
    }

    fn fresh_name(&self, base: &str) -> String {
        let mut taken = HashSet::default();
        if let Some(root) = self.ast.root() {
            for id in self.ast.preorder(root) {
                match self.ast.kind(id) {
                    NodeKind::Variable(name) | NodeKind::VariableDef(name) => {
                        taken.insert(name.clone());
                    }
                    NodeKind::Join(vars) => {
                        taken.insert(vars.left.clone());
                        taken.insert(vars.right.clone());
                    }
                    _ => {}
                }
            }
        }
        let mut candidate = base.to_string();
        let mut n = 1;
        while taken.contains(&candidate) {
            candidate = format!("{}{}", base, n);
            n += 1;
        }
        candidate
    }
}
