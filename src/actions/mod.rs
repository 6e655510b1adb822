//! CRUD actions for profiles and analyses
//!
//! Every action takes the caller's [`Identity`] explicitly, validates form
//! input before touching the store, and reports the routes it invalidated in
//! its [`Mutation`](crate::revalidate::Mutation) result.

mod analysis;
mod profile;

use crate::auth::Identity;
use crate::error::{Error, Result};
use crate::validation::{
    FieldRule, DESCRIPTION_MAX_LEN, EMAIL_MAX_LEN, NAME_MAX_LEN, TITLE_MAX_LEN,
};

pub use analysis::*;
pub use profile::*;

pub const NAME: FieldRule = FieldRule::required("name", NAME_MAX_LEN);
pub const EMAIL: FieldRule = FieldRule::optional("email", EMAIL_MAX_LEN);
pub const TITLE: FieldRule = FieldRule::required("title", TITLE_MAX_LEN);
pub const DESCRIPTION: FieldRule = FieldRule::optional("description", DESCRIPTION_MAX_LEN);

/// A blank identity never reaches the store
fn ensure_identity(identity: &Identity) -> Result<()> {
    if identity.as_str().trim().is_empty() {
        return Err(Error::Unauthorized);
    }
    Ok(())
}
