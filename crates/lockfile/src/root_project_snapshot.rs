use crate::ProjectSnapshot;
use pipe_trait::Pipe;
use std::collections::BTreeMap;

/// Id of the importer at the root of the workspace.
pub const ROOT_IMPORTER_ID: &str = ".";

/// Snapshot of the root project.
#[derive(Debug, Clone, PartialEq)]
pub enum RootProjectSnapshot {
    /// Workspace with an `importers` map keyed by importer id.
    Multi(BTreeMap<String, ProjectSnapshot>),
    /// Single project whose dependency maps sit at the top level of the lockfile.
    Single(ProjectSnapshot),
}

impl RootProjectSnapshot {
    /// Snapshot of the importer with id `importer_id`.
    pub fn get(&self, importer_id: &str) -> Option<&'_ ProjectSnapshot> {
        match self {
            RootProjectSnapshot::Multi(importers) => importers.get(importer_id),
            RootProjectSnapshot::Single(snapshot) => {
                (importer_id == ROOT_IMPORTER_ID).then_some(snapshot)
            }
        }
    }

    /// Ids of every importer, in sorted order.
    pub fn importer_ids(&self) -> Vec<&'_ str> {
        match self {
            RootProjectSnapshot::Multi(importers) => importers.keys().map(String::as_str).collect(),
            RootProjectSnapshot::Single(_) => vec![ROOT_IMPORTER_ID],
        }
    }

    /// Keep only the importers listed in `importer_ids`.
    pub fn retain<'a>(&self, importer_ids: impl IntoIterator<Item = &'a str>) -> Self {
        match self {
            RootProjectSnapshot::Multi(importers) => importer_ids
                .into_iter()
                .filter_map(|id| importers.get_key_value(id))
                .map(|(id, snapshot)| (id.clone(), snapshot.clone()))
                .collect::<BTreeMap<_, _>>()
                .pipe(RootProjectSnapshot::Multi),
            RootProjectSnapshot::Single(snapshot) => {
                if importer_ids.into_iter().any(|id| id == ROOT_IMPORTER_ID) {
                    RootProjectSnapshot::Single(snapshot.clone())
                } else {
                    RootProjectSnapshot::Single(ProjectSnapshot::default())
                }
            }
        }
    }
}
