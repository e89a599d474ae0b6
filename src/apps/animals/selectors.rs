//! Memoized selections over the animals state.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::action::{AnimalsAction, DataAction, SystemAction, UiAction};
use super::state::{Animal, AnimalId, AnimalsState, Category, CategoryId, Status};
use crate::selector::{DependencySelector, KeyedSelector, OutputSelector, Selector};

pub type AnimalsSelector<O> = Selector<AnimalsState, AnimalsAction, O>;

/// Map dependency: pointer equality first, value equality as fallback.
fn shared_map<K, V>(
    extract: impl Fn(&AnimalsState) -> &Arc<BTreeMap<K, V>> + Send + Sync + 'static,
) -> DependencySelector<AnimalsState, Arc<BTreeMap<K, V>>>
where
    K: Ord + Send + Sync + 'static,
    V: PartialEq + Send + Sync + 'static,
{
    DependencySelector::new(
        move |state| Arc::clone(extract(state)),
        |previous, next| !Arc::ptr_eq(previous, next) && previous != next,
    )
}

/// True for actions that can touch the category map.
pub fn affects_categories(action: &AnimalsAction) -> bool {
    matches!(action, AnimalsAction::Data(DataAction::CategoriesFetched(_)))
}

/// True for actions that can touch the animal map.
pub fn affects_animals(action: &AnimalsAction) -> bool {
    match action {
        AnimalsAction::Ui(action) => matches!(
            action,
            UiAction::AddAnimal(_)
                | UiAction::UpdateAnimal(_)
                | UiAction::DeleteAnimal(_)
                | UiAction::DismissFailure(_)
        ),
        AnimalsAction::Data(action) => !matches!(action, DataAction::CategoriesFetched(_)),
        AnimalsAction::System(SystemAction::Refresh) => false,
    }
}

/// Categories sorted by name.
pub fn sorted_categories() -> AnimalsSelector<Vec<Category>> {
    Selector::new(OutputSelector::distinct(|state: &AnimalsState| {
        let mut categories: Vec<Category> = state.categories.data.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        categories
    }))
    .with_filter(|_, action| affects_categories(action))
    .depends_on(shared_map(|state| &state.categories.data))
}

/// Animals in `category_id`, sorted by name.
pub fn animals_in_category(category_id: CategoryId) -> AnimalsSelector<Vec<Animal>> {
    Selector::new(OutputSelector::distinct(move |state: &AnimalsState| {
        let mut animals: Vec<Animal> = state
            .animals
            .data
            .values()
            .filter(|animal| animal.category_id == category_id)
            .cloned()
            .collect();
        animals.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        animals
    }))
    .with_filter(|_, action| affects_animals(action))
    .depends_on(shared_map(|state| &state.animals.data))
}

/// [`animals_in_category`] keyed by the category being shown.
pub fn animals_by_category() -> KeyedSelector<CategoryId, AnimalsState, AnimalsAction, Vec<Animal>> {
    KeyedSelector::new(|category_id: &CategoryId| animals_in_category(category_id.clone()))
}

/// Number of animals. Cheap enough to skip dependencies.
pub fn animal_count() -> AnimalsSelector<usize> {
    Selector::new(OutputSelector::distinct(|state: &AnimalsState| {
        state.animals.data.len()
    }))
}

pub fn category_status() -> AnimalsSelector<Option<Status>> {
    Selector::new(OutputSelector::distinct(|state: &AnimalsState| {
        state.categories.status.clone()
    }))
}

/// One animal by id, with its pending change status.
pub fn animal_detail(id: AnimalId) -> AnimalsSelector<(Option<Animal>, Option<Status>)> {
    Selector::new(OutputSelector::distinct(move |state: &AnimalsState| {
        (state.animal(&id).cloned(), state.mutation_status(&id).cloned())
    }))
    .with_filter(|_, action| affects_animals(action))
}
