use uuid::Uuid;

use crate::auth::Identity;
use crate::error::Result;
use crate::models::{Analysis, AnalysisForm, AnalysisRow};
use crate::revalidate::{Mutation, Revalidation, Route};
use crate::store::{Collection, ScopedGateway};
use crate::validation::{validate_optional, validate_required};

use super::{ensure_identity, DESCRIPTION, TITLE};

/// Actions on the caller's analyses
#[derive(Clone)]
pub struct AnalysisActions {
    gateway: ScopedGateway,
    route: Route,
}

impl AnalysisActions {
    pub fn new(gateway: ScopedGateway, route: Route) -> Self {
        Self { gateway, route }
    }

    /// All of the caller's analyses, newest first
    pub async fn list(&self, identity: &Identity) -> Result<Vec<Analysis>> {
        ensure_identity(identity)?;
        self.gateway.list::<Analysis>(identity).await
    }

    /// One of the caller's analyses, or `None`
    pub async fn get(&self, identity: &Identity, id: Uuid) -> Result<Option<Analysis>> {
        ensure_identity(identity)?;
        self.gateway.get::<Analysis>(identity, Some(id)).await
    }

    pub async fn create(&self, identity: &Identity, form: &AnalysisForm) -> Result<Mutation<Analysis>> {
        ensure_identity(identity)?;
        let row = analysis_row(form)?;
        let analysis = self.gateway.insert::<Analysis, _>(identity, &row).await?;
        Ok(self.mutated(analysis))
    }

    /// Replace the editable fields. Omitted optional fields are reset to
    /// their defaults, as on create.
    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        form: &AnalysisForm,
    ) -> Result<Mutation<Analysis>> {
        ensure_identity(identity)?;
        let row = analysis_row(form)?;
        let analysis = self
            .gateway
            .update::<Analysis, _>(identity, Some(id), &row)
            .await?;
        Ok(self.mutated(analysis))
    }

    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<Mutation<()>> {
        ensure_identity(identity)?;
        self.gateway
            .delete(Collection::Analyses, identity, Some(id))
            .await?;
        Ok(self.mutated(()))
    }

    fn mutated<T>(&self, value: T) -> Mutation<T> {
        Mutation::new(value, Revalidation::route(self.route.clone()))
    }
}

fn analysis_row(form: &AnalysisForm) -> Result<AnalysisRow> {
    Ok(AnalysisRow {
        title: validate_required(TITLE, &form.title)?,
        description: validate_optional(DESCRIPTION, form.description.as_deref())?,
        status: form.status.unwrap_or_default(),
        data: form.data.clone().unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::AnalysisStatus;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn actions() -> (Arc<MemoryStore>, AnalysisActions) {
        let store = Arc::new(MemoryStore::new());
        let actions = AnalysisActions::new(
            ScopedGateway::new(store.clone()),
            Route::new("/dashboard"),
        );
        (store, actions)
    }

    #[tokio::test]
    async fn q1_review_lifecycle() {
        let (_, actions) = actions();
        let u1 = Identity::new("u1");

        let created = actions
            .create(
                &u1,
                &AnalysisForm::new("Q1 Review").with_status(AnalysisStatus::Draft),
            )
            .await
            .unwrap()
            .into_inner();
        assert_eq!(created.title, "Q1 Review");
        assert_eq!(created.status, AnalysisStatus::Draft);
        assert_eq!(created.description, None);
        assert!(created.data.is_empty());

        let updated = actions
            .update(
                &u1,
                created.id,
                &AnalysisForm::new("Q1 Review Final").with_status(AnalysisStatus::Completed),
            )
            .await
            .unwrap()
            .into_inner();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "Q1 Review Final");
        assert_eq!(updated.status, AnalysisStatus::Completed);

        let listed = actions.list(&u1).await.unwrap();
        assert_eq!(listed, vec![updated]);
    }

    #[tokio::test]
    async fn create_then_get_returns_the_same_record() {
        let (_, actions) = actions();
        let u1 = Identity::new("u1");
        let mut data = serde_json::Map::new();
        data.insert("score".to_string(), json!(7));

        let created = actions
            .create(
                &u1,
                &AnalysisForm::new("Churn")
                    .with_description("monthly")
                    .with_status(AnalysisStatus::InProgress)
                    .with_data(data),
            )
            .await
            .unwrap()
            .into_inner();

        let fetched = actions.get(&u1, created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.data["score"], json!(7));
    }

    #[tokio::test]
    async fn other_identities_cannot_see_or_touch_records() {
        let (store, actions) = actions();
        let a = Identity::new("user_a");
        let b = Identity::new("user_b");

        let record = actions
            .create(&a, &AnalysisForm::new("private"))
            .await
            .unwrap()
            .into_inner();

        assert!(actions.list(&b).await.unwrap().is_empty());
        assert!(actions.get(&b, record.id).await.unwrap().is_none());

        let err = actions
            .update(&b, record.id, &AnalysisForm::new("hijacked"))
            .await
            .unwrap_err();
        assert!(err.store_fault().unwrap().is_no_rows());

        actions.delete(&b, record.id).await.unwrap();
        assert_eq!(store.len(Collection::Analyses), 1);
        assert_eq!(actions.get(&a, record.id).await.unwrap().unwrap().title, "private");
    }

    #[tokio::test]
    async fn delete_then_get_is_absent() {
        let (_, actions) = actions();
        let u1 = Identity::new("u1");
        let record = actions
            .create(&u1, &AnalysisForm::new("temp"))
            .await
            .unwrap()
            .into_inner();

        let deleted = actions.delete(&u1, record.id).await.unwrap();
        assert!(deleted.revalidate.invalidates(&Route::new("/dashboard")));
        assert!(actions.get(&u1, record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (_, actions) = actions();
        let u1 = Identity::new("u1");
        for title in ["first", "second", "third"] {
            actions.create(&u1, &AnalysisForm::new(title)).await.unwrap();
        }
        let titles: Vec<String> = actions
            .list(&u1)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn invalid_forms_make_no_store_calls() {
        let (store, actions) = actions();
        let u1 = Identity::new("u1");

        for title in ["", "  ", "\n\t"] {
            let err = actions.create(&u1, &AnalysisForm::new(title)).await.unwrap_err();
            assert!(matches!(err, Error::Validation { field: "title", .. }));
        }
        let err = actions
            .create(
                &u1,
                &AnalysisForm::new("ok").with_description(&"d".repeat(501)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "description", .. }));
        let err = actions
            .update(&u1, Uuid::new_v4(), &AnalysisForm::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        assert_eq!(store.calls(), 0);
    }
}
