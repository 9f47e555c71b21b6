//! Search query building

use crate::search::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, Term};

/// A query against a towns index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchQuery {
    /// Every document
    MatchAll,

    /// Exact town name, exact tag, or full-text description match
    Town(String),
}

impl SearchQuery {
    /// Interpret raw user input. Empty input, or input longer than
    /// `max_length` characters, browses everything.
    pub fn from_user_input(input: Option<&str>, max_length: usize) -> Self {
        match input.map(str::trim) {
            Some(text) if !text.is_empty() && text.chars().count() <= max_length => {
                SearchQuery::Town(text.to_string())
            }
            _ => SearchQuery::MatchAll,
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, SearchQuery::MatchAll)
    }
}

/// Builds Tantivy queries for one index generation
pub struct QueryBuilder<'a> {
    schema: &'a Schema,
    index: &'a Index,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(schema: &'a Schema, index: &'a Index) -> Self {
        Self { schema, index }
    }

    pub fn build(&self, query: &SearchQuery) -> SearchResult<Box<dyn Query>> {
        let text = match query {
            SearchQuery::MatchAll => return Ok(Box::new(AllQuery)),
            SearchQuery::Town(text) => text,
        };

        let name_field = self.field("town_name")?;
        let tags_field = self.field("town_tags")?;
        let description_field = self.field("town_description")?;

        let by_name = TermQuery::new(
            Term::from_field_text(name_field, text),
            IndexRecordOption::Basic,
        );
        let by_tag = TermQuery::new(
            Term::from_field_text(tags_field, &text.to_lowercase()),
            IndexRecordOption::Basic,
        );

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![
            (Occur::Should, Box::new(by_name)),
            (Occur::Should, Box::new(by_tag)),
        ];
        for term in self.description_terms(description_field, text)? {
            clauses.push((
                Occur::Should,
                Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)),
            ));
        }

        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Words of `text` as the description field's analyzer indexes them.
    /// Query syntax such as `AND` or `field:value` is plain text here.
    fn description_terms(&self, field: Field, text: &str) -> SearchResult<Vec<Term>> {
        let mut analyzer = self.index.tokenizer_for_field(field).map_err(|e| {
            SearchError::QueryParsingFailed(format!("No analyzer for description: {}", e))
        })?;

        let mut terms = Vec::new();
        let mut stream = analyzer.token_stream(text);
        stream.process(&mut |token| terms.push(Term::from_field_text(field, &token.text)));
        Ok(terms)
    }

    fn field(&self, name: &str) -> SearchResult<Field> {
        self.schema
            .get_field(name)
            .map_err(|_| SearchError::QueryParsingFailed(format!("Index has no field '{}'", name)))
    }
}
