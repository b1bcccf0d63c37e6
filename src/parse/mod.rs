mod error;
mod grammar;
mod parser;

pub use error::ParseError;
pub use parser::ParsedCriteria;

/// Parse criteria DSL into its definitions, in input order.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid DSL syntax.
pub fn parse(input: &str) -> Result<Vec<ParsedCriteria>, ParseError> {
    use winnow::Parser;
    grammar::parse_criteria
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
