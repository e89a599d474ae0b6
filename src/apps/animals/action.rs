use super::state::{Animal, AnimalId, Category, CategoryId, Diet};
use crate::flow::Action;

#[derive(Debug, Clone, PartialEq)]
pub enum AnimalsAction {
    Ui(UiAction),
    System(SystemAction),
    Data(DataAction),
}

impl Action for AnimalsAction {}

/// Things the user did.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    CategoryListAppeared,
    AnimalListAppeared,
    AddAnimal(Animal),
    UpdateAnimal(Animal),
    DeleteAnimal(AnimalId),
    /// Clears a failed change once the user has seen it.
    DismissFailure(AnimalId),
}

impl UiAction {
    /// Add action for a new animal with a freshly generated id.
    pub fn add(name: impl Into<String>, diet: Diet, category_id: CategoryId) -> Self {
        Self::AddAnimal(Animal {
            id: AnimalId::generate(),
            name: name.into(),
            diet,
            category_id,
        })
    }
}

/// Things the host system did.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemAction {
    /// Data may be stale; reload whatever is not already loading.
    Refresh,
}

/// Results reported by the persistence collaborator.
///
/// Errors travel as messages so actions stay comparable.
#[derive(Debug, Clone, PartialEq)]
pub enum DataAction {
    CategoriesFetched(Result<Vec<Category>, String>),
    AnimalsFetched(Result<Vec<Animal>, String>),
    AnimalAdded {
        id: AnimalId,
        result: Result<Animal, String>,
    },
    AnimalUpdated {
        id: AnimalId,
        result: Result<Animal, String>,
    },
    AnimalDeleted {
        id: AnimalId,
        result: Result<(), String>,
    },
}

impl From<UiAction> for AnimalsAction {
    fn from(action: UiAction) -> Self {
        Self::Ui(action)
    }
}

impl From<SystemAction> for AnimalsAction {
    fn from(action: SystemAction) -> Self {
        Self::System(action)
    }
}

impl From<DataAction> for AnimalsAction {
    fn from(action: DataAction) -> Self {
        Self::Data(action)
    }
}
