//! Persistence collaborator consumed by the listener, never by the reducer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{Animal, AnimalId, Category, CategoryId, Diet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("Animal '{id}' not found")]
    NotFound { id: AnimalId },

    #[error("Animal '{id}' already exists")]
    Conflict { id: AnimalId },

    #[error("Persistence unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous query and mutation operations over the catalog.
#[async_trait]
pub trait AnimalsPersistence: Send + Sync + 'static {
    async fn fetch_categories(&self) -> Result<Vec<Category>, PersistenceError>;

    async fn fetch_animals(&self) -> Result<Vec<Animal>, PersistenceError>;

    /// Stores a new animal and returns the persisted value.
    async fn add_animal(&self, animal: Animal) -> Result<Animal, PersistenceError>;

    /// Replaces an existing animal and returns the persisted value.
    async fn update_animal(&self, animal: Animal) -> Result<Animal, PersistenceError>;

    async fn delete_animal(&self, id: AnimalId) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Tables {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    animals: BTreeMap<AnimalId, Animal>,
}

/// In-process persistence with a switchable outage mode.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    tables: Mutex<Tables>,
    failing: AtomicBool,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with a few categories and animals.
    pub fn sample() -> Self {
        let categories = [("amphibian", "Amphibian"), ("bird", "Bird"), ("mammal", "Mammal")]
            .into_iter()
            .map(|(id, name)| Category {
                id: CategoryId::from(id),
                name: name.to_string(),
            })
            .collect();

        let animals = [
            ("bumblebee-bat", "Bumblebee Bat", Diet::Carnivorous, "mammal"),
            ("cat", "Cat", Diet::Carnivorous, "mammal"),
            ("dog", "Dog", Diet::Omnivorous, "mammal"),
            ("kiwi", "Kiwi", Diet::Omnivorous, "bird"),
            ("newt", "Newt", Diet::Carnivorous, "amphibian"),
            ("parrot", "Parrot", Diet::Herbivorous, "bird"),
        ]
        .into_iter()
        .map(|(id, name, diet, category)| {
            let animal = Animal {
                id: AnimalId::from(id),
                name: name.to_string(),
                diet,
                category_id: CategoryId::from(category),
            };
            (animal.id.clone(), animal)
        })
        .collect();

        Self {
            tables: Mutex::new(Tables {
                categories,
                animals,
            }),
            ..Self::default()
        }
    }

    /// Loads tables from JSON: `{"categories": [...], "animals": {"id": {...}}}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let tables: Tables = serde_json::from_str(json)?;
        Ok(Self {
            tables: Mutex::new(tables),
            ..Self::default()
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.tables.lock())
    }

    /// Delays every call, to exercise suspension.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// While failing, every call returns [`PersistenceError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn animal_count(&self) -> usize {
        self.tables.lock().animals.len()
    }

    async fn begin(&self) -> Result<(), PersistenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AnimalsPersistence for InMemoryPersistence {
    async fn fetch_categories(&self) -> Result<Vec<Category>, PersistenceError> {
        self.begin().await?;
        Ok(self.tables.lock().categories.clone())
    }

    async fn fetch_animals(&self) -> Result<Vec<Animal>, PersistenceError> {
        self.begin().await?;
        Ok(self.tables.lock().animals.values().cloned().collect())
    }

    async fn add_animal(&self, animal: Animal) -> Result<Animal, PersistenceError> {
        self.begin().await?;
        let mut tables = self.tables.lock();
        if tables.animals.contains_key(&animal.id) {
            return Err(PersistenceError::Conflict { id: animal.id });
        }
        tables.animals.insert(animal.id.clone(), animal.clone());
        Ok(animal)
    }

    async fn update_animal(&self, animal: Animal) -> Result<Animal, PersistenceError> {
        self.begin().await?;
        let mut tables = self.tables.lock();
        let Some(slot) = tables.animals.get_mut(&animal.id) else {
            return Err(PersistenceError::NotFound { id: animal.id });
        };
        *slot = animal.clone();
        Ok(animal)
    }

    async fn delete_animal(&self, id: AnimalId) -> Result<(), PersistenceError> {
        self.begin().await?;
        match self.tables.lock().animals.remove(&id) {
            Some(_) => Ok(()),
            None => Err(PersistenceError::NotFound { id }),
        }
    }
}
