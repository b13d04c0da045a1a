use std::fmt;

use strum_macros::Display;

/// Dense index of a node inside its [`Ast`](crate::Ast).
///
/// Ids are only stable until the next deletion; deleting compacts the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Separator {
    #[strum(to_string = "/")]
    Child,
    #[strum(to_string = "//")]
    DescendantOrSelf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Glob {
    #[strum(to_string = "*")]
    Wildcard,
    #[strum(to_string = ".")]
    Self_,
    #[strum(to_string = "..")]
    Parent,
    #[strum(to_string = "node()")]
    Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EqualityKind {
    #[strum(to_string = "=")]
    Value,
    #[strum(to_string = "==")]
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LogicOp {
    #[strum(to_string = "and")]
    And,
    #[strum(to_string = "or")]
    Or,
    #[strum(to_string = "not")]
    Not,
}

/// The variables a [`NodeKind::Join`] equates; each side's key expression
/// is rooted at its variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinVars {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TagName(String),
    Text,
    PathGlobbing(Glob),
    PathSeparator(Separator),
    /// `doc("name")`, or `doc()` for the caller supplied context document.
    Document(Option<String>),
    Precedence,
    Concatenation,
    Filter,
    Equality(EqualityKind),
    LogicOperator(LogicOp),
    Variable(String),
    ConstantString(String),
    Tag(String),
    LetClause,
    VariableDef(String),
    ForClause,
    WhereClause,
    ReturnClause,
    /// Children: `ForClause`, optional `LetClause`, optional `WhereClause`,
    /// `ReturnClause`, in that order.
    FlwrExpression,
    LetExpression,
    SomeClause,
    SomeExpression,
    Empty,
    /// Children: left sub-query, right sub-query, left key, right key.
    Join(JoinVars),
}

/// How many children a node kind takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::Between(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::Between(min, max) => write!(f, "{} to {}", min, max),
            Arity::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

impl NodeKind {
    pub fn arity(&self) -> Arity {
        use NodeKind::*;
        match self {
            TagName(_) | Text | PathGlobbing(_) | Document(_) | Variable(_)
            | ConstantString(_) => Arity::Exact(0),
            Precedence | VariableDef(_) | WhereClause | ReturnClause | Empty => Arity::Exact(1),
            PathSeparator(_) | Concatenation | Filter | Equality(_) | LetExpression
            | SomeExpression => Arity::Exact(2),
            LogicOperator(LogicOp::Not) => Arity::Exact(1),
            LogicOperator(_) => Arity::Exact(2),
            Tag(_) => Arity::Between(0, 1),
            LetClause | ForClause | SomeClause => Arity::AtLeast(1),
            FlwrExpression => Arity::Between(2, 4),
            Join(_) => Arity::Exact(4),
        }
    }

    /// The kind name without its payload, as used in diagnostics.
    pub fn name(&self) -> &'static str {
        use NodeKind::*;
        match self {
            TagName(_) => "TagName",
            Text => "Text",
            PathGlobbing(_) => "PathGlobbing",
            PathSeparator(_) => "PathSeparator",
            Document(_) => "Document",
            Precedence => "Precedence",
            Concatenation => "Concatenation",
            Filter => "Filter",
            Equality(_) => "Equality",
            LogicOperator(_) => "LogicOperator",
            Variable(_) => "Variable",
            ConstantString(_) => "ConstantString",
            Tag(_) => "Tag",
            LetClause => "LetClause",
            VariableDef(_) => "VariableDef",
            ForClause => "ForClause",
            WhereClause => "WhereClause",
            ReturnClause => "ReturnClause",
            FlwrExpression => "FLWRExpression",
            LetExpression => "LetExpression",
            SomeClause => "SomeClause",
            SomeExpression => "SomeExpression",
            Empty => "Empty",
            Join(_) => "Join",
        }
    }

    /// The name a `VariableDef` binds.
    pub fn binds(&self) -> Option<&str> {
        match self {
            NodeKind::VariableDef(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use NodeKind::*;
        let name = self.name();
        match self {
            TagName(tag) | Tag(tag) => write!(f, "{} [{}]", name, tag),
            PathGlobbing(glob) => write!(f, "{} [{}]", name, glob),
            PathSeparator(separator) => write!(f, "{} [{}]", name, separator),
            Document(Some(document)) => write!(f, "{} [{}]", name, document),
            Equality(kind) => write!(f, "{} [{}]", name, kind),
            LogicOperator(op) => write!(f, "{} [{}]", name, op),
            Variable(var) | VariableDef(var) => write!(f, "{} [${}]", name, var),
            ConstantString(s) => write!(f, "{} [{:?}]", name, s),
            Join(vars) => write!(f, "{} [${} = ${}]", name, vars.left, vars.right),
            _ => f.write_str(name),
        }
    }
}

/// One node of the arena.
///
/// `edges` and `parent` are plain ids; the arena keeps them consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) edges: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn edges(&self) -> &[NodeId] {
        &self.edges
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn label(&self) -> String {
        self.kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(
            NodeKind::PathSeparator(Separator::DescendantOrSelf).to_string(),
            "PathSeparator [//]"
        );
        assert_eq!(NodeKind::Variable("x".to_string()).to_string(), "Variable [$x]");
        assert_eq!(
            NodeKind::ConstantString("a \"b\"".to_string()).to_string(),
            r#"ConstantString ["a \"b\""]"#
        );
        assert_eq!(NodeKind::FlwrExpression.to_string(), "FLWRExpression");
    }

    #[test]
    fn test_arity() {
        assert!(NodeKind::LogicOperator(LogicOp::Not).arity().accepts(1));
        assert!(!NodeKind::LogicOperator(LogicOp::And).arity().accepts(1));
        assert!(NodeKind::Tag("a".to_string()).arity().accepts(0));
        assert!(NodeKind::FlwrExpression.arity().accepts(4));
        assert!(!NodeKind::FlwrExpression.arity().accepts(5));
        assert!(!NodeKind::ForClause.arity().accepts(0));
    }
}
