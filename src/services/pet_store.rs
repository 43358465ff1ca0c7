use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::pet::{NewPet, Pet, PetId, PetPatch};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Document store holding user-submitted listings.
#[async_trait]
pub trait PetStore: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<Pet>, StoreError>;

    async fn create(&self, pet: NewPet) -> Result<Pet, StoreError>;

    /// `Ok(None)` when no listing has `id`.
    async fn update(&self, id: &PetId, patch: PetPatch) -> Result<Option<Pet>, StoreError>;

    /// Returns the removed listing, `Ok(None)` when absent.
    async fn delete(&self, id: &PetId) -> Result<Option<Pet>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Process-local store, in insertion order.
#[derive(Default)]
pub struct MemoryPetStore {
    pets: RwLock<Vec<Pet>>,
}

impl MemoryPetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PetStore for MemoryPetStore {
    async fn list(&self) -> Result<Vec<Pet>, StoreError> {
        Ok(self.pets.read().await.iter().rev().cloned().collect())
    }

    async fn create(&self, pet: NewPet) -> Result<Pet, StoreError> {
        let now = Utc::now();
        let pet = Pet {
            id: PetId::generate(),
            name: pet.name,
            image: pet.image,
            description: pet.description,
            created_at: now,
            updated_at: now,
        };
        self.pets.write().await.push(pet.clone());
        Ok(pet)
    }

    async fn update(&self, id: &PetId, patch: PetPatch) -> Result<Option<Pet>, StoreError> {
        let mut pets = self.pets.write().await;
        Ok(pets.iter_mut().find(|pet| pet.id == *id).map(|pet| {
            patch.apply(pet);
            pet.clone()
        }))
    }

    async fn delete(&self, id: &PetId) -> Result<Option<Pet>, StoreError> {
        let mut pets = self.pets.write().await;
        let index = pets.iter().position(|pet| pet.id == *id);
        Ok(index.map(|index| pets.remove(index)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_pet(name: &str) -> NewPet {
        NewPet {
            name: name.to_string(),
            image: format!("https://img.example/{name}.jpg"),
            description: "friendly".to_string(),
        }
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryPetStore::new();
        store.create(new_pet("a")).await.unwrap();
        store.create(new_pet("b")).await.unwrap();

        let names: Vec<_> = store.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn update_touches_only_supplied_fields() {
        let store = MemoryPetStore::new();
        let pet = store.create(new_pet("a")).await.unwrap();

        let patch = PetPatch {
            description: Some("sleepy".to_string()),
            ..PetPatch::default()
        };
        let updated = store.update(&pet.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.name, "a");
        assert_eq!(updated.description, "sleepy");
        assert!(updated.updated_at >= pet.updated_at);
    }

    #[tokio::test]
    async fn missing_ids_are_reported_as_none() {
        let store = MemoryPetStore::new();
        let id = PetId::generate();
        assert!(store.update(&id, PetPatch::default()).await.unwrap().is_none());
        assert!(store.delete(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_once() {
        let store = MemoryPetStore::new();
        let pet = store.create(new_pet("a")).await.unwrap();
        assert_eq!(store.delete(&pet.id).await.unwrap().map(|p| p.id), Some(pet.id));
        assert!(store.delete(&pet.id).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }
}
