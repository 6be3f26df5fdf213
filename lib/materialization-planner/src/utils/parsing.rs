use graphql_parser::{
    query::{self, ParseError as QueryParseError},
    schema::{self, ParseError as SchemaParseError},
};

#[inline]
pub fn safe_parse_schema(
    sdl: &str,
) -> Result<schema::Document<'static, String>, SchemaParseError> {
    graphql_parser::parse_schema::<String>(sdl).map(|doc| doc.into_static())
}

#[inline]
pub fn safe_parse_operation(
    operation: &str,
) -> Result<query::Document<'static, String>, QueryParseError> {
    graphql_parser::parse_query::<String>(operation).map(|op| op.into_static())
}
