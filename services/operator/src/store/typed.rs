use std::marker::PhantomData;
use std::sync::Arc;

use lfo_reconcile::ObjectKey;

use super::{RecordStore, StoreError};
use crate::resources::{Object, Spec};

/// Typed view of one kind in a [`RecordStore`].
pub struct Records<S> {
    store: Arc<dyn RecordStore>,
    _kind: PhantomData<fn() -> S>,
}

impl<S> Clone for Records<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _kind: PhantomData,
        }
    }
}

impl<S: Spec> Records<S> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    pub async fn get(&self, key: &ObjectKey) -> Result<Option<Object<S>>, StoreError> {
        match self.store.get(S::KIND, key).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, object: &Object<S>) -> Result<Object<S>, StoreError> {
        let doc = self
            .store
            .create(S::KIND, serde_json::to_value(object)?)
            .await?;
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn patch_status(
        &self,
        key: &ObjectKey,
        status: &S::Status,
    ) -> Result<Object<S>, StoreError> {
        let doc = self
            .store
            .patch_status(S::KIND, key, serde_json::to_value(status)?)
            .await?;
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<Object<S>>, StoreError> {
        self.store
            .list(S::KIND, namespace)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use lfo_reconcile::Condition;

    use super::*;
    use crate::resources::{ProjectSpec, ProjectState, ProjectStatus};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_typed_round_trip() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let projects = Records::<ProjectSpec>::new(store);
        let key = ObjectKey::new("default", "proj-a");

        let created = projects
            .create(&Object::new(
                &key,
                ProjectSpec {
                    name: "proj-a".to_string(),
                },
            ))
            .await
            .unwrap();
        assert_eq!(created.metadata.generation, 1);
        assert!(created.status.external_id().is_none());

        let status = ProjectStatus {
            id: "prj_123".to_string(),
            state: ProjectState::Ready,
            conditions: vec![Condition::available("Project created")],
        };
        projects.patch_status(&key, &status).await.unwrap();

        let fetched = projects.get(&key).await.unwrap().unwrap();
        assert_eq!(fetched.status.external_id(), Some("prj_123"));
        assert_eq!(fetched.status.state, ProjectState::Ready);
        assert_eq!(projects.list(None).await.unwrap().len(), 1);
    }
}
