use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::campaign::run::CampaignRun;

/// In-memory registry of campaign runs. Runs live until the process exits.
#[derive(Default)]
pub struct CampaignStore {
    runs: RwLock<HashMap<Uuid, Arc<CampaignRun>>>,
}

impl CampaignStore {
    pub fn new() -> CampaignStore {
        CampaignStore::default()
    }

    pub fn insert(&self, run: CampaignRun) -> Arc<CampaignRun> {
        let run = Arc::new(run);

        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(run.id(), run.clone());

        run
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<CampaignRun>> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
