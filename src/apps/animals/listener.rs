use std::sync::Arc;

use tokio::task::JoinHandle;

use super::action::{AnimalsAction, SystemAction, UiAction};
use super::persistence::AnimalsPersistence;
use super::reducer::AnimalsReducer;
use super::state::{AnimalId, AnimalsState, Status};
use super::thunks;
use crate::listener::Listener;
use crate::store::Store;

/// Starts persistence work when an action moves state into a waiting marker.
///
/// - `categories.status` entering `Waiting` after an appear or refresh
///   fetches categories.
/// - `animals.status` entering `Waiting` after an appear or refresh fetches
///   animals.
/// - A queued mutation entering `Waiting` after an add/update/delete runs
///   the matching persistence call.
///
/// When records were dropped before reaching the listener, every waiting
/// marker in the current state without a running call gets one.
///
/// In-flight thunks are aborted when the listener is dropped.
pub struct AnimalsListener {
    persistence: Arc<dyn AnimalsPersistence>,
    in_flight: Vec<InFlight>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Work {
    Categories,
    Animals,
    Mutation(AnimalId),
}

struct InFlight {
    work: Work,
    /// Started while reconciling after dropped records.
    reconciled: bool,
    task: JoinHandle<()>,
}

impl AnimalsListener {
    pub fn new(persistence: Arc<dyn AnimalsPersistence>) -> Self {
        Self {
            persistence,
            in_flight: Vec::new(),
        }
    }

    /// Thunks started and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .iter()
            .filter(|entry| !entry.task.is_finished())
            .count()
    }

    fn running(&self, work: &Work, reconciled_only: bool) -> bool {
        self.in_flight.iter().any(|entry| {
            entry.work == *work
                && (entry.reconciled || !reconciled_only)
                && !entry.task.is_finished()
        })
    }

    /// Spawns the thunk for `work` against the current `state`.
    fn start(
        &mut self,
        work: Work,
        state: &AnimalsState,
        store: &Store<AnimalsReducer>,
        reconciled: bool,
    ) {
        // A buffered record whose work was already started while reconciling.
        if self.running(&work, true) {
            return;
        }
        let persistence = Arc::clone(&self.persistence);
        let task = match &work {
            Work::Categories => {
                store.spawn_thunk(move |store| thunks::fetch_categories(store, persistence))
            }
            Work::Animals => {
                store.spawn_thunk(move |store| thunks::fetch_animals(store, persistence))
            }
            Work::Mutation(id) => {
                let Some(mutation) = state.animals.queue.get(id) else {
                    return;
                };
                match (state.animal(id).cloned(), mutation.previous.is_some()) {
                    (Some(animal), false) => store
                        .spawn_thunk(move |store| thunks::add_animal(store, persistence, animal)),
                    (Some(animal), true) => store.spawn_thunk(move |store| {
                        thunks::update_animal(store, persistence, animal)
                    }),
                    (None, _) => {
                        let id = id.clone();
                        store.spawn_thunk(move |store| {
                            thunks::delete_animal(store, persistence, id)
                        })
                    }
                }
            }
        };
        self.in_flight.push(InFlight {
            work,
            reconciled,
            task,
        });
    }
}

fn entered_waiting(old: Option<&Status>, current: Option<&Status>) -> bool {
    old != Some(&Status::Waiting) && current == Some(&Status::Waiting)
}

fn mutation_started(old: &AnimalsState, current: &AnimalsState, id: &AnimalId) -> bool {
    entered_waiting(old.mutation_status(id), current.mutation_status(id))
}

impl Listener<AnimalsReducer> for AnimalsListener {
    fn on_transition(
        &mut self,
        old: &AnimalsState,
        action: &AnimalsAction,
        store: &Store<AnimalsReducer>,
    ) {
        self.in_flight.retain(|entry| !entry.task.is_finished());
        let current = store.state();

        let loads_categories = matches!(
            action,
            AnimalsAction::Ui(UiAction::CategoryListAppeared)
                | AnimalsAction::System(SystemAction::Refresh)
        );
        let loads_animals = matches!(
            action,
            AnimalsAction::Ui(UiAction::AnimalListAppeared)
                | AnimalsAction::System(SystemAction::Refresh)
        );

        if loads_categories
            && entered_waiting(old.categories.status.as_ref(), current.categories.status.as_ref())
        {
            self.start(Work::Categories, &current, store, false);
        }

        if loads_animals
            && entered_waiting(old.animals.status.as_ref(), current.animals.status.as_ref())
        {
            self.start(Work::Animals, &current, store, false);
        }

        let AnimalsAction::Ui(action) = action else {
            return;
        };
        let id = match action {
            UiAction::AddAnimal(animal) | UiAction::UpdateAnimal(animal) => &animal.id,
            UiAction::DeleteAnimal(id) => id,
            _ => return,
        };
        if mutation_started(old, &current, id) {
            self.start(Work::Mutation(id.clone()), &current, store, false);
        }
    }

    fn on_lagged(&mut self, missed: u64, store: &Store<AnimalsReducer>) {
        self.in_flight.retain(|entry| !entry.task.is_finished());
        let current = store.state();

        let mut pending = Vec::new();
        if current.categories.status == Some(Status::Waiting) {
            pending.push(Work::Categories);
        }
        if current.animals.status == Some(Status::Waiting) {
            pending.push(Work::Animals);
        }
        pending.extend(
            current
                .animals
                .queue
                .iter()
                .filter(|(_, mutation)| mutation.status == Status::Waiting)
                .map(|(id, _)| Work::Mutation(id.clone())),
        );

        for work in pending {
            if self.running(&work, false) {
                continue;
            }
            tracing::debug!(missed, work = ?work, "Restarting work after dropped records");
            self.start(work, &current, store, true);
        }
    }
}

impl Drop for AnimalsListener {
    fn drop(&mut self) {
        for entry in self.in_flight.drain(..) {
            entry.task.abort();
        }
    }
}
