//! Town search documents

use crate::models::{TownFields, TownKey};
use crate::search::error::{SearchError, SearchResult};
use crate::search::schema::ID_FIELD;
use serde::{Deserialize, Serialize};
use tantivy::schema::{Field, Schema, Value};
use tantivy::TantivyDocument;

/// The shape of a town inside a search index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownDocument {
    pub owner: String,
    pub town_id: String,
    pub town_name: String,
    pub town_description: String,
    pub town_tags: Vec<String>,
}

/// Project a town onto its search document.
///
/// Full and delta reindexing both go through this function, so a town
/// indexed either way ends up with identical fields.
pub fn shape_document(key: &TownKey, fields: &TownFields) -> TownDocument {
    TownDocument {
        owner: key.owner.clone(),
        town_id: key.town_id.clone(),
        town_name: fields.name.clone(),
        town_description: fields.description.clone(),
        town_tags: fields.tags.iter().map(|tag| tag.to_lowercase()).collect(),
    }
}

fn field(schema: &Schema, name: &str) -> SearchResult<Field> {
    schema
        .get_field(name)
        .map_err(|_| SearchError::SchemaError(format!("Index has no field '{}'", name)))
}

fn first_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

impl TownDocument {
    /// Convert to a Tantivy document stored under `doc_id`
    pub fn to_tantivy_doc(&self, doc_id: &str, schema: &Schema) -> SearchResult<TantivyDocument> {
        let mut doc = TantivyDocument::new();

        doc.add_text(field(schema, ID_FIELD)?, doc_id);
        doc.add_text(field(schema, "owner")?, &self.owner);
        doc.add_text(field(schema, "town_id")?, &self.town_id);
        doc.add_text(field(schema, "town_name")?, &self.town_name);
        doc.add_text(field(schema, "town_description")?, &self.town_description);

        let tags = field(schema, "town_tags")?;
        for tag in &self.town_tags {
            doc.add_text(tags, tag);
        }

        Ok(doc)
    }

    /// Rebuild a document and its id from stored fields
    pub fn from_tantivy_doc(
        doc: &TantivyDocument,
        schema: &Schema,
    ) -> SearchResult<(String, TownDocument)> {
        let id = first_text(doc, field(schema, ID_FIELD)?);
        let town_tags = doc
            .get_all(field(schema, "town_tags")?)
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect();

        Ok((
            id,
            TownDocument {
                owner: first_text(doc, field(schema, "owner")?),
                town_id: first_text(doc, field(schema, "town_id")?),
                town_name: first_text(doc, field(schema, "town_name")?),
                town_description: first_text(doc, field(schema, "town_description")?),
                town_tags,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::town_index_schema;

    fn fields() -> TownFields {
        TownFields {
            name: "My Town".to_string(),
            address: "DA-1234-5678-9012".to_string(),
            description: "Cherry blossoms everywhere".to_string(),
            tags: vec!["Fruit".to_string(), "beach".to_string()],
            image: Some("my-town.jpg".to_string()),
        }
    }

    #[test]
    fn test_shape_document() {
        let key = TownKey::new("alice", "my-town");
        let doc = shape_document(&key, &fields());

        assert_eq!(doc.owner, "alice");
        assert_eq!(doc.town_id, "my-town");
        assert_eq!(doc.town_name, "My Town");
        assert_eq!(doc.town_description, "Cherry blossoms everywhere");
        assert_eq!(doc.town_tags, vec!["fruit", "beach"]);
    }

    #[test]
    fn test_shape_document_is_deterministic() {
        let key = TownKey::new("alice", "my-town");
        assert_eq!(shape_document(&key, &fields()), shape_document(&key, &fields()));
    }

    #[test]
    fn test_tantivy_conversion_keeps_stored_fields() {
        let schema = town_index_schema().to_tantivy();
        let key = TownKey::new("alice", "my-town");
        let doc = shape_document(&key, &fields());

        let tantivy_doc = doc.to_tantivy_doc(&key.document_id(), &schema).unwrap();
        let (id, restored) = TownDocument::from_tantivy_doc(&tantivy_doc, &schema).unwrap();

        assert_eq!(id, "alice-my-town");
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_missing_field_is_schema_error() {
        let schema = tantivy::schema::Schema::builder().build();
        let key = TownKey::new("alice", "my-town");
        let result = shape_document(&key, &fields()).to_tantivy_doc("alice-my-town", &schema);
        assert!(matches!(result, Err(SearchError::SchemaError(_))));
    }
}
