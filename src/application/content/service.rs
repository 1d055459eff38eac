use std::sync::Arc;

use crate::application::clock::Clock;
use crate::application::repos::{ContentRepo, ContentWriteRepo, SitesRepo};
use crate::application::storage::StorageDeadline;

/// Content lifecycle: creation, edits, status transitions and scheduling.
#[derive(Clone)]
pub struct ContentLifecycleService {
    pub(crate) sites: Arc<dyn SitesRepo>,
    pub(crate) reader: Arc<dyn ContentRepo>,
    pub(crate) writer: Arc<dyn ContentWriteRepo>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) deadline: StorageDeadline,
}

impl ContentLifecycleService {
    pub fn new(
        sites: Arc<dyn SitesRepo>,
        reader: Arc<dyn ContentRepo>,
        writer: Arc<dyn ContentWriteRepo>,
        clock: Arc<dyn Clock>,
        deadline: StorageDeadline,
    ) -> Self {
        Self {
            sites,
            reader,
            writer,
            clock,
            deadline,
        }
    }
}
