use xot::Xot;
use xqlite_ast::{Ast, EqualityKind, Glob, LogicOp, NodeId, NodeKind, Separator};

use crate::cartesian::CartesianIterator;
use crate::collector::Collector;
use crate::compare::sequences_value_equal;
use crate::context::ContextStack;
use crate::document::Documents;
use crate::document_order::DocumentOrderAnnotations;
use crate::error::{Error, Result};
use crate::result::EvalResult;
use crate::sequence::Sequence;

/// Tree-walking evaluator for one query run.
pub struct Interpreter<'a> {
    ast: &'a Ast,
    pub(crate) xot: &'a mut Xot,
    documents: &'a mut Documents,
    context: ContextStack,
    pub(crate) collector: Collector,
    pub(crate) order: DocumentOrderAnnotations,
}

impl<'a> Interpreter<'a> {
    pub fn new(ast: &'a Ast, xot: &'a mut Xot, documents: &'a mut Documents) -> Self {
        Self {
            ast,
            xot,
            documents,
            context: ContextStack::new(),
            collector: Collector::new(),
            order: DocumentOrderAnnotations::new(),
        }
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    pub fn context(&self) -> &ContextStack {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ContextStack {
        &mut self.context
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Evaluate the whole tree. The context document, if any, is the
    /// initial input of the outermost expression.
    pub fn run(&mut self) -> Result<EvalResult> {
        let Some(root) = self.ast.root() else {
            return Ok(Sequence::new().into());
        };
        let input = self
            .documents
            .context()
            .map(Sequence::from)
            .unwrap_or_default();
        self.eval(root, &input)
    }

    /// Open a scope around `f`, closing it again whether `f` succeeds or
    /// fails.
    pub(crate) fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.context.open_scope();
        let result = f(self);
        self.context.close_scope();
        result
    }

    pub fn eval(&mut self, id: NodeId, input: &Sequence) -> Result<EvalResult> {
        let ast = self.ast;
        let children = ast.children(id);
        match ast.kind(id) {
            NodeKind::TagName(name) => Ok(self.child_elements(input, Some(name)).into()),
            NodeKind::Text => self.text(id, input),
            NodeKind::PathGlobbing(glob) => Ok(self.glob(*glob, input).into()),
            NodeKind::PathSeparator(separator) => {
                self.path(id, *separator, children[0], children[1], input)
            }
            NodeKind::Document(name) => {
                let root = self.documents.load(self.xot, name.as_deref())?;
                Ok(Sequence::from(root).into())
            }
            NodeKind::Precedence
            | NodeKind::WhereClause
            | NodeKind::ReturnClause => self.eval(children[0], input),
            NodeKind::Concatenation => {
                let left = self.sequence(children[0], input)?;
                let right = self.sequence(children[1], input)?;
                Ok(left.concat(right).into())
            }
            NodeKind::Filter => self.filter(children[0], children[1], input),
            NodeKind::Equality(kind) => {
                let left = self.sequence(children[0], input)?;
                let right = self.sequence(children[1], input)?;
                let equal = match kind {
                    EqualityKind::Value => sequences_value_equal(self.xot, &left, &right),
                    EqualityKind::Reference => !left.is_empty() && left == right,
                };
                Ok(equal.into())
            }
            NodeKind::LogicOperator(op) => self.logic(id, *op, children, input),
            NodeKind::Variable(name) => Ok(self.context.find_var(name)?.clone().into()),
            NodeKind::ConstantString(s) => {
                Ok(Sequence::from(self.collector.text(self.xot, s)).into())
            }
            NodeKind::Tag(name) => {
                let element = self.collector.element(self.xot, name);
                if let Some(&content) = children.first() {
                    let content = self.sequence(content, input)?;
                    for node in content.iter() {
                        self.collector.import(self.xot, element, node)?;
                    }
                    self.collector.set_content(element, content);
                }
                Ok(Sequence::from(element).into())
            }
            NodeKind::LetClause => {
                for &def in children {
                    self.eval(def, input)?;
                }
                Ok(EvalResult::None)
            }
            NodeKind::VariableDef(name) => {
                let value = self.sequence(children[0], input)?;
                self.context.push_var(name.clone(), value);
                Ok(EvalResult::None)
            }
            NodeKind::ForClause | NodeKind::SomeClause => Ok(EvalResult::Iterator(
                CartesianIterator::begin(self, id, input)?,
            )),
            NodeKind::FlwrExpression => self.flwr(children, input),
            NodeKind::LetExpression => self.with_scope(|this| {
                this.eval(children[0], input)?;
                this.eval(children[1], input)
            }),
            NodeKind::SomeExpression => self.some(children[0], children[1], input),
            NodeKind::Empty => Ok(self.sequence(children[0], input)?.is_empty().into()),
            NodeKind::Join(vars) => self.join(children, vars, input),
        }
    }

    /// Evaluate a node that must produce a node sequence.
    pub(crate) fn sequence(&mut self, id: NodeId, input: &Sequence) -> Result<Sequence> {
        let label = self.ast.label(id);
        self.eval(id, input)?.into_sequence(&label)
    }

    fn truth(&mut self, id: NodeId, input: &Sequence) -> Result<bool> {
        let label = self.ast.label(id);
        self.eval(id, input)?.truth(&label)
    }

    // Element children of each input node, optionally only those with a
    // given name, in input order.
    fn child_elements(&self, input: &Sequence, name: Option<&str>) -> Sequence {
        let name_id = match name {
            Some(name) => match self.xot.name(name) {
                Some(name_id) => Some(name_id),
                // a name the arena has never seen cannot match anything
                None => return Sequence::new(),
            },
            None => None,
        };
        let xot = &*self.xot;
        input
            .iter()
            .flat_map(move |node| xot.children(node))
            .filter(|&child| match xot.element(child) {
                Some(element) => name_id.map_or(true, |name_id| element.name() == name_id),
                None => false,
            })
            .collect()
    }

    fn text(&self, id: NodeId, input: &Sequence) -> Result<EvalResult> {
        let xot = &*self.xot;
        let mut texts = Sequence::new();
        for node in input.iter() {
            if !(xot.is_element(node) || xot.is_document(node)) {
                return Err(Error::TypeMismatch {
                    node: self.ast.label(id),
                    expected: "element nodes",
                    found: if xot.is_text(node) {
                        "a text node"
                    } else {
                        "another kind of node"
                    },
                });
            }
            texts.extend(xot.children(node).filter(|&child| xot.is_text(child)));
        }
        Ok(texts.into())
    }

    fn glob(&self, glob: Glob, input: &Sequence) -> Sequence {
        let xot = &*self.xot;
        match glob {
            Glob::Self_ => input.clone(),
            Glob::Wildcard => self.child_elements(input, None),
            // join tuple members give back the nodes they were built from
            Glob::Node => input
                .iter()
                .flat_map(move |node| match self.collector.member(node) {
                    Some(originals) => originals.as_slice().to_vec(),
                    None => xot
                        .children(node)
                        .filter(|&child| xot.is_element(child) || xot.is_text(child))
                        .collect::<Vec<_>>(),
                })
                .collect(),
            Glob::Parent => input
                .iter()
                .filter_map(|node| xot.parent(node))
                .collect::<Sequence>()
                .deduplicate(xot, &self.order),
        }
    }

    fn path(
        &mut self,
        id: NodeId,
        separator: Separator,
        left: NodeId,
        right: NodeId,
        input: &Sequence,
    ) -> Result<EvalResult> {
        let left = self.sequence(left, input)?;
        let contexts: Sequence = match separator {
            Separator::Child => left,
            Separator::DescendantOrSelf => {
                let xot = &*self.xot;
                left.iter()
                    .flat_map(move |node| {
                        xot.descendants(node)
                            .filter(move |&d| d == node || xot.is_element(d))
                    })
                    .collect()
            }
        };
        let label = self.ast.label(id);
        let mut result = Sequence::new();
        for node in contexts {
            let step = self.eval(right, &node.into())?.into_sequence(&label)?;
            result.extend(step);
        }
        Ok(result.deduplicate(self.xot, &self.order).into())
    }

    fn filter(&mut self, subject: NodeId, predicate: NodeId, input: &Sequence) -> Result<EvalResult> {
        let candidates = self.sequence(subject, input)?;
        let mut kept = Sequence::new();
        for node in candidates {
            if self.truth(predicate, &node.into())? {
                kept.push(node);
            }
        }
        Ok(kept.into())
    }

    fn logic(
        &mut self,
        id: NodeId,
        op: LogicOp,
        children: &[NodeId],
        input: &Sequence,
    ) -> Result<EvalResult> {
        let label = self.ast.label(id);
        let left = self.eval(children[0], input)?;
        if op == LogicOp::Not {
            return Ok((!left.truth(&label)?).into());
        }
        let right = self.eval(children[1], input)?;
        match (left, right) {
            (EvalResult::Sequence(left), EvalResult::Sequence(right)) => {
                let combined = match op {
                    LogicOp::And => left.intersect(&right, self.xot, &self.order),
                    _ => left.union(right, self.xot, &self.order),
                };
                Ok(combined.into())
            }
            (left, right) => {
                let (left, right) = (left.truth(&label)?, right.truth(&label)?);
                Ok(match op {
                    LogicOp::And => left && right,
                    _ => left || right,
                }
                .into())
            }
        }
    }

    fn flwr(&mut self, clauses: &[NodeId], input: &Sequence) -> Result<EvalResult> {
        let ast = self.ast;
        let find = |kind: NodeKind| clauses.iter().copied().find(|&c| ast.kind(c) == &kind);
        let for_clause = find(NodeKind::ForClause);
        let let_clause = find(NodeKind::LetClause);
        let where_clause = find(NodeKind::WhereClause);
        let return_clause = find(NodeKind::ReturnClause);
        let (Some(for_clause), Some(return_clause)) = (for_clause, return_clause) else {
            return Err(Error::TypeMismatch {
                node: "FLWRExpression".to_string(),
                expected: "`for` and `return` clauses",
                found: "an incomplete expression",
            });
        };
        self.with_scope(|this| {
            let label = ast.label(for_clause);
            let mut iterator = this.eval(for_clause, input)?.into_iterator(&label)?;
            let mut output = Sequence::new();
            while !iterator.is_finished() {
                // per-tuple bindings live in their own scope, above the
                // iterator's
                let produced = this.with_scope(|this| {
                    if let Some(let_clause) = let_clause {
                        this.eval(let_clause, input)?;
                    }
                    if let Some(where_clause) = where_clause {
                        if !this.truth(where_clause, input)? {
                            return Ok(None);
                        }
                    }
                    this.sequence(return_clause, input).map(Some)
                })?;
                if let Some(produced) = produced {
                    output.extend(produced);
                }
                iterator.advance(this, input)?;
            }
            Ok(output.into())
        })
    }

    fn some(&mut self, clause: NodeId, condition: NodeId, input: &Sequence) -> Result<EvalResult> {
        let label = self.ast.label(clause);
        self.with_scope(|this| {
            let mut iterator = this.eval(clause, input)?.into_iterator(&label)?;
            while !iterator.is_finished() {
                if this.truth(condition, input)? {
                    return Ok(true.into());
                }
                iterator.advance(this, input)?;
            }
            Ok(false.into())
        })
    }
}
