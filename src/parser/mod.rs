mod postprocess;
mod pratt;

use crate::ast::Node;
use crate::error::Result;

/// Parses a JSONata expression into its postprocessed AST.
pub fn parse(source: &str) -> Result<Node> {
    let ast = pratt::Parser::new(source)?.parse()?;
    postprocess::process(ast)
}
