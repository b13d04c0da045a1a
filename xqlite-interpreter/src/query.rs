use std::path::PathBuf;

use tracing::debug;
use xot::output::xml::Parameters;
use xot::output::Indentation;
use xot::Xot;
use xqlite_ast::Ast;

use crate::collector::Collector;
use crate::document::Documents;
use crate::error::Result;
use crate::interpret::Interpreter;
use crate::result::EvalResult;
use crate::sequence::Sequence;

/// Options for running a query end to end.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Directory `doc("name")` resolves names against.
    pub base_dir: PathBuf,
    /// Name of the element the result sequence is wrapped in.
    pub result_root: String,
    pub indent: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            result_root: "result".to_string(),
            indent: false,
        }
    }
}

impl EvalOptions {
    /// An empty document cache resolving names against `base_dir`.
    pub fn documents(&self) -> Documents {
        Documents::new(self.base_dir.clone())
    }
}

/// A parsed query, ready to be rewritten and evaluated.
#[derive(Debug, Clone)]
pub struct Query {
    ast: Ast,
}

impl Query {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            ast: xqlite_ast::parse(source)?,
        })
    }

    pub fn from_ast(ast: Ast) -> Self {
        Self { ast }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Decorrelate implicit joins. Returns how many were rewritten.
    pub fn rewrite(&mut self) -> Result<usize> {
        let count = xqlite_ast::rewrite(&mut self.ast)?;
        debug!(count, "join rewrite finished");
        Ok(count)
    }

    /// Evaluate to a node sequence. A boolean result becomes a single
    /// `true` or `false` text node.
    pub fn evaluate(&self, xot: &mut Xot, documents: &mut Documents) -> Result<Sequence> {
        let mut interpreter = Interpreter::new(&self.ast, xot, documents);
        let result = interpreter.run()?;
        debug!(synthesized = interpreter.collector().len(), "evaluation finished");
        match result {
            EvalResult::Boolean(b) => {
                let text = if b { "true" } else { "false" };
                Ok(Sequence::from(xot.new_text(text)))
            }
            other => other.into_sequence("query"),
        }
    }

    /// Evaluate and serialize the result wrapped in one root element.
    pub fn run(
        &self,
        xot: &mut Xot,
        documents: &mut Documents,
        options: &EvalOptions,
    ) -> Result<String> {
        let sequence = self.evaluate(xot, documents)?;
        serialize(xot, &sequence, &options.result_root, options.indent)
    }
}

/// Serialize `sequence` as the children of a new `root` element.
pub fn serialize(xot: &mut Xot, sequence: &Sequence, root: &str, indent: bool) -> Result<String> {
    let mut collector = Collector::new();
    let element = collector.element(xot, root);
    for node in sequence.iter() {
        collector.import(xot, element, node)?;
    }
    let parameters = Parameters {
        indentation: indent.then(Indentation::default),
        ..Default::default()
    };
    Ok(xot.serialize_xml_string(parameters, element)?)
}
