use crate::auth::Identity;
use crate::error::Result;
use crate::models::{Profile, ProfileForm, ProfileRow};
use crate::revalidate::{Mutation, Revalidation, Route};
use crate::store::{Collection, ScopedGateway};
use crate::validation::{validate_optional, validate_required};

use super::{ensure_identity, EMAIL, NAME};

/// Actions on the caller's single profile
#[derive(Clone)]
pub struct ProfileActions {
    gateway: ScopedGateway,
    route: Route,
}

impl ProfileActions {
    pub fn new(gateway: ScopedGateway, route: Route) -> Self {
        Self { gateway, route }
    }

    /// The caller's profile, or `None` if they have not created one yet
    pub async fn get(&self, identity: &Identity) -> Result<Option<Profile>> {
        ensure_identity(identity)?;
        self.gateway.get::<Profile>(identity, None).await
    }

    /// Create the caller's profile.
    ///
    /// A second profile for the same identity is refused by the store's
    /// unique owner constraint, not here.
    pub async fn create(&self, identity: &Identity, form: &ProfileForm) -> Result<Mutation<Profile>> {
        ensure_identity(identity)?;
        let row = profile_row(form)?;
        let profile = self.gateway.insert::<Profile, _>(identity, &row).await?;
        Ok(self.mutated(profile))
    }

    /// Update the caller's profile. Fails with a store fault if there is none.
    pub async fn update(&self, identity: &Identity, form: &ProfileForm) -> Result<Mutation<Profile>> {
        ensure_identity(identity)?;
        let row = profile_row(form)?;
        let profile = self
            .gateway
            .update::<Profile, _>(identity, None, &row)
            .await?;
        Ok(self.mutated(profile))
    }

    /// Delete the caller's profile. Deleting a missing profile also succeeds.
    pub async fn delete(&self, identity: &Identity) -> Result<Mutation<()>> {
        ensure_identity(identity)?;
        self.gateway
            .delete(Collection::Profiles, identity, None)
            .await?;
        Ok(self.mutated(()))
    }

    fn mutated<T>(&self, value: T) -> Mutation<T> {
        Mutation::new(value, Revalidation::route(self.route.clone()))
    }
}

fn profile_row(form: &ProfileForm) -> Result<ProfileRow> {
    Ok(ProfileRow {
        name: validate_required(NAME, &form.name)?,
        email: validate_optional(EMAIL, form.email.as_deref())?,
    })
}
