//! Explicit field mappings for index generations

use serde::{Deserialize, Serialize};
use tantivy::schema::{Schema, STORED, STRING, TEXT};

/// Field holding the document id (`"<owner>-<town_id>"`)
pub const ID_FIELD: &str = "id";

/// How a field is indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Indexed as a single untokenized term, matched exactly
    Keyword,

    /// Tokenized full text
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub kind: FieldKind,
}

/// Declared schema of an index generation. Every field is stored so hits
/// can be rendered without going back to the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    fields: Vec<FieldMapping>,
}

impl IndexSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldMapping {
            name: name.into(),
            kind: FieldKind::Keyword,
        });
        self
    }

    pub fn text(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldMapping {
            name: name.into(),
            kind: FieldKind::Text,
        });
        self
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn kind_of(&self, name: &str) -> Option<FieldKind> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.kind)
    }

    /// Build the Tantivy schema. The id field is always present.
    pub fn to_tantivy(&self) -> Schema {
        let mut schema_builder = Schema::builder();
        schema_builder.add_text_field(ID_FIELD, STRING | STORED);

        for field in self.fields.iter().filter(|f| f.name != ID_FIELD) {
            match field.kind {
                FieldKind::Keyword => schema_builder.add_text_field(&field.name, STRING | STORED),
                FieldKind::Text => schema_builder.add_text_field(&field.name, TEXT | STORED),
            };
        }

        schema_builder.build()
    }
}

/// Mapping used for every generation of the towns index
pub fn town_index_schema() -> IndexSchema {
    IndexSchema::new()
        .keyword(ID_FIELD)
        .keyword("owner")
        .keyword("town_id")
        .keyword("town_name")
        .keyword("town_tags")
        .text("town_description")
}
