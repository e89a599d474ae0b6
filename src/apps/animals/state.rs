use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flow::State;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimalId(pub String);

impl AnimalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for AnimalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diet {
    Herbivorous,
    Carnivorous,
    Omnivorous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
    pub id: AnimalId,
    pub name: String,
    pub diet: Diet,
    pub category_id: CategoryId,
}

/// Progress of an asynchronous operation, modelled in state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Waiting,
    Success,
    Failure { error: String },
}

/// Change applied optimistically and awaiting persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub status: Status,
    /// Value to restore if the change fails; `None` removes the entry.
    pub previous: Option<Animal>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Categories {
    pub data: Arc<BTreeMap<CategoryId, Category>>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animals {
    pub data: Arc<BTreeMap<AnimalId, Animal>>,
    pub status: Option<Status>,
    pub queue: Arc<BTreeMap<AnimalId, Mutation>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimalsState {
    pub categories: Categories,
    pub animals: Animals,
}

impl State for AnimalsState {}

impl AnimalsState {
    pub fn animal(&self, id: &AnimalId) -> Option<&Animal> {
        self.animals.data.get(id)
    }

    pub fn category(&self, id: &CategoryId) -> Option<&Category> {
        self.categories.data.get(id)
    }

    pub fn mutation_status(&self, id: &AnimalId) -> Option<&Status> {
        self.animals.queue.get(id).map(|mutation| &mutation.status)
    }

    pub fn is_pending(&self, id: &AnimalId) -> bool {
        self.mutation_status(id) == Some(&Status::Waiting)
    }
}
