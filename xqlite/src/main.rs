mod error;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use xot::Xot;
use xqlite_interpreter::{EvalOptions, Query};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// query file (`-` for stdin)
    query: PathBuf,
    /// xml document `doc()` refers to. Its directory is also where
    /// `doc("name")` looks for documents (default: current directory)
    #[arg(long)]
    input: Option<PathBuf>,
    /// evaluate the query as written, without decorrelating joins
    #[arg(long)]
    no_rewrite: bool,
    /// print the (rewritten) query tree instead of evaluating it
    #[arg(long)]
    dump_ast: bool,
    /// write the (rewritten) query tree as Graphviz DOT to this file
    #[arg(long)]
    dot: Option<PathBuf>,
    /// indent the serialized result
    #[arg(long)]
    indent: bool,
    /// name of the element wrapping the result
    #[arg(long, default_value = "result")]
    result_root: String,
    /// log rewrites and document loads to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn run(&self) -> anyhow::Result<()> {
        let source_id = self.query.display().to_string();
        let src = read_query(&self.query)?;
        let ast = match xqlite_ast::parse(&src) {
            Ok(ast) => ast,
            Err(e) => {
                error::render_query_error(&source_id, &src, &e)?;
                anyhow::bail!("could not parse {}", source_id);
            }
        };
        let mut query = Query::from_ast(ast);
        if !self.no_rewrite {
            let joins = query.rewrite()?;
            debug!(joins, "rewrite applied");
        }

        if let Some(dot) = &self.dot {
            fs::write(dot, query.ast().to_dot())
                .with_context(|| format!("cannot write {}", dot.display()))?;
        }
        if self.dump_ast {
            print!("{}", query.ast());
            return Ok(());
        }

        let options = EvalOptions {
            base_dir: self
                .input
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
            result_root: self.result_root.clone(),
            indent: self.indent,
        };
        let mut xot = Xot::new();
        let mut documents = options.documents();
        if let Some(input) = &self.input {
            let xml = fs::read_to_string(input)
                .with_context(|| format!("cannot read {}", input.display()))?;
            let input_id = input.display().to_string();
            let root = match xot.parse(&xml) {
                Ok(root) => root,
                Err(e) => {
                    error::render_parse_error(&input_id, &xml, &e)?;
                    anyhow::bail!("could not parse {}", input_id);
                }
            };
            documents.set_context(root);
        }

        let output = query.run(&mut xot, &mut documents, &options)?;
        println!("{}", output);
        Ok(())
    }
}

fn read_query(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut src = String::new();
        std::io::stdin().read_to_string(&mut src)?;
        return Ok(src);
    }
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
