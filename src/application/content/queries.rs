use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::visibility::{ScopedContent, load_visible};
use crate::domain::actor::Actor;
use crate::domain::entities::ContentRecord;
use crate::domain::policy::Permissions;

use super::service::ContentLifecycleService;

impl ContentLifecycleService {
    pub async fn get_content(&self, actor: &Actor, id: Uuid) -> Result<ContentRecord, AppError> {
        Ok(self.load(actor, id).await?.content)
    }

    pub async fn permissions(&self, actor: &Actor, id: Uuid) -> Result<Permissions, AppError> {
        let scoped = self.load(actor, id).await?;
        Ok(Permissions::for_content(actor, &scoped.scope))
    }

    pub(super) async fn load(&self, actor: &Actor, id: Uuid) -> Result<ScopedContent, AppError> {
        load_visible(
            self.reader.as_ref(),
            self.sites.as_ref(),
            &self.deadline,
            actor,
            id,
        )
        .await
    }
}
