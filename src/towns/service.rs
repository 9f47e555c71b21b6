use crate::error::{AppError, Result};
use crate::models::{is_valid_owner, slugify, Town, TownInput, TownKey};
use crate::state::DocumentStore;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// Validated town mutations and lookups.
///
/// Every mutation goes through the document store, which records the
/// matching change event in the same transaction.
#[derive(Clone)]
pub struct TownService {
    store: Arc<dyn DocumentStore>,
}

impl TownService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn prepare(input: TownInput) -> Result<TownInput> {
        let input = input.normalized();
        input.validate()?;
        Ok(input)
    }

    fn check_owner(owner: &str) -> Result<()> {
        if !is_valid_owner(owner) {
            return Err(AppError::Validation(format!(
                "Invalid owner '{}': use letters, numbers and underscores",
                owner
            )));
        }
        Ok(())
    }

    fn key(owner: &str, town_id: &str) -> Result<TownKey> {
        Self::check_owner(owner)?;
        Ok(TownKey::new(owner, town_id))
    }

    pub async fn create_town(&self, owner: &str, input: TownInput) -> Result<Town> {
        let input = Self::prepare(input)?;
        let town_id = slugify(&input.name);
        if town_id.is_empty() {
            return Err(AppError::Validation(
                "Town names must contain at least one letter or number.".to_string(),
            ));
        }

        let town = Town::new(Self::key(owner, &town_id)?, input.into_fields());
        let event = self.store.insert_town(&town).await?;

        info!(town = %town.key, event_id = %event.id, "Town created");
        Ok(town)
    }

    pub async fn update_town(&self, owner: &str, town_id: &str, input: TownInput) -> Result<Town> {
        let input = Self::prepare(input)?;
        let key = Self::key(owner, town_id)?;

        let mut town = self
            .store
            .find_town(&key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Town {} not found", key)))?;
        town.apply(input.into_fields());

        let event = self.store.update_town(&town).await?;

        info!(town = %town.key, event_id = %event.id, "Town updated");
        Ok(town)
    }

    pub async fn delete_town(&self, owner: &str, town_id: &str) -> Result<()> {
        let key = Self::key(owner, town_id)?;
        let event = self.store.delete_town(&key).await?;

        info!(town = %key, event_id = %event.id, "Town deleted");
        Ok(())
    }

    pub async fn find_town(&self, owner: &str, town_id: &str) -> Result<Town> {
        let key = Self::key(owner, town_id)?;
        self.store
            .find_town(&key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Town {} not found", key)))
    }

    pub async fn find_towns(&self, owner: &str) -> Result<Vec<Town>> {
        Self::check_owner(owner)?;
        self.store.find_towns(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChangeLog, InMemoryStore};

    fn input(name: &str) -> TownInput {
        TownInput {
            name: name.to_string(),
            address: "DA-1234-5678-9012".to_string(),
            description: "A quiet island".to_string(),
            tags: vec!["Beach, fruit".to_string()],
            image: None,
        }
    }

    fn service() -> (TownService, InMemoryStore) {
        let store = InMemoryStore::new();
        (TownService::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_create_derives_slug_and_records_event() {
        let (service, store) = service();

        let town = service.create_town("alice", input("My Town")).await.unwrap();
        assert_eq!(town.key, TownKey::new("alice", "my-town"));
        assert_eq!(town.fields.tags, vec!["beach", "fruit"]);
        assert_eq!(store.backlog().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_duplicate_conflicts() {
        let (service, _store) = service();
        service.create_town("alice", input("My Town")).await.unwrap();

        let result = service.create_town("alice", input("my town")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // Another owner may use the same name
        service.create_town("bob", input("My Town")).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_input_rejected_without_event() {
        let (service, store) = service();
        let mut bad = input("My Town");
        bad.address = "nowhere".to_string();

        let result = service.create_town("alice", bad).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.backlog().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_owner_with_separator_rejected() {
        let (service, store) = service();

        let result = service.create_town("a-b", input("Cc")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(matches!(service.find_towns("").await, Err(AppError::Validation(_))));
        assert_eq!(store.backlog().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_image_and_created_at() {
        let (service, _store) = service();
        let mut with_image = input("My Town");
        with_image.image = Some("alice-my-town.png".to_string());
        let created = service.create_town("alice", with_image).await.unwrap();

        let mut changed = input("My Town");
        changed.description = "Now with a museum".to_string();
        let updated = service.update_town("alice", "my-town", changed).await.unwrap();

        assert_eq!(updated.fields.image.as_deref(), Some("alice-my-town.png"));
        assert_eq!(updated.fields.description, "Now with a museum");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_missing_town_not_found() {
        let (service, _store) = service();
        assert!(matches!(
            service.update_town("alice", "nope", input("Nope")).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_town("alice", "nope").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.find_town("alice", "nope").await,
            Err(AppError::NotFound(_))
        ));
    }
}
