use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use validator::{Validate, ValidationError};

/// Names and tags: letters, numbers and spaces, starting with a letter or number.
pub static NAME_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ]+$").expect("valid name regex"));

/// Dream addresses look like `DA-1234-5678-9012`.
pub static DREAM_ADDRESS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^DA-[0-9]{4}-[0-9]{4}-[0-9]{4}$").expect("valid address regex"));

/// Owner usernames. No `-`, which separates owner and town in document ids.
pub static OWNER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("valid owner regex"));

/// Unique key of a town: the owner plus the URL slug of the town name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TownKey {
    /// Username of the owner
    pub owner: String,

    /// URL friendly town id
    pub town_id: String,
}

impl TownKey {
    pub fn new(owner: impl Into<String>, town_id: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            town_id: town_id.into(),
        }
    }

    /// Search document id for this town, e.g. `alice-my-town`.
    pub fn document_id(&self) -> String {
        format!("{}-{}", self.owner, self.town_id)
    }
}

/// Whether `owner` is a valid username
pub fn is_valid_owner(owner: &str) -> bool {
    OWNER_REGEX.is_match(owner)
}

impl fmt::Display for TownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.town_id)
    }
}

/// The mutable part of a town. Change events carry a full copy of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownFields {
    /// Display name
    pub name: String,

    /// Dream address
    pub address: String,

    /// Free text description
    pub description: String,

    /// Lower-cased, de-duplicated tags
    pub tags: Vec<String>,

    /// Stored image file name, if any
    pub image: Option<String>,
}

/// A town as held by the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Town {
    pub key: TownKey,
    pub fields: TownFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Town {
    /// Create a new town with the current timestamp
    pub fn new(key: TownKey, fields: TownFields) -> Self {
        Self {
            key,
            fields,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Replace the mutable fields, keeping the stored image when the new
    /// fields carry none.
    pub fn apply(&mut self, mut fields: TownFields) {
        if fields.image.is_none() {
            fields.image = self.fields.image.take();
        }
        self.fields = fields;
        self.updated_at = Some(Utc::now());
    }
}

/// User supplied town data, before normalisation into [`TownFields`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TownInput {
    #[validate(
        length(min = 1, max = 10, message = "Town names must be between 1 and 10 characters long."),
        regex(
            path = *NAME_ID_REGEX,
            message = "Town names can only have letters, numbers, and spaces, and must start with a letter or number."
        )
    )]
    pub name: String,

    #[validate(regex(
        path = *DREAM_ADDRESS_REGEX,
        message = "Dream addresses must be of the form DA-XXXX-YYYY-ZZZZ, where X, Y and Z are all numbers."
    ))]
    pub address: String,

    #[validate(length(
        min = 3,
        max = 4096,
        message = "Please provide a description of your town between 3 and 4096 characters long."
    ))]
    pub description: String,

    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,

    #[serde(default)]
    pub image: Option<String>,
}

impl TownInput {
    /// Trim text fields and normalise tags: each entry may hold several
    /// comma separated tags, which are trimmed, lower-cased and
    /// de-duplicated in order of first appearance.
    pub fn normalized(self) -> Self {
        let mut seen = HashSet::new();
        let tags = self
            .tags
            .iter()
            .flat_map(|raw| raw.split(','))
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .filter(|tag| seen.insert(tag.clone()))
            .collect();

        Self {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            description: self.description.trim().to_string(),
            tags,
            image: self.image.filter(|image| !image.trim().is_empty()),
        }
    }

    pub fn into_fields(self) -> TownFields {
        TownFields {
            name: self.name,
            address: self.address,
            description: self.description,
            tags: self.tags,
            image: self.image,
        }
    }
}

fn validate_tags(tags: &Vec<String>) -> Result<(), ValidationError> {
    if tags.iter().all(|tag| NAME_ID_REGEX.is_match(tag)) {
        Ok(())
    } else {
        let mut error = ValidationError::new("tags");
        error.message =
            Some("Town tags can only contain letters, numbers and spaces.".into());
        Err(error)
    }
}

/// URL slug of a town name: lower-case, runs of anything that is not a
/// letter or digit collapse to one `-`, no leading or trailing `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
