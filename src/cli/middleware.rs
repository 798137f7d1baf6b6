use crate::app::{AppContext, GatorError, Result};
use crate::domain::User;

/// Resolve the logged-in user for an authenticated command.
///
/// The session only stores a name, so the full record is looked up again on
/// every call. An unset name fails before the user store is touched.
pub fn resolve_user(ctx: &AppContext) -> Result<User> {
    let name = ctx.session.current_user().ok_or(GatorError::NotLoggedIn)?;

    ctx.users
        .get_user(name)
        .map_err(|source| GatorError::UserResolution {
            name: name.to_string(),
            source: Box::new(source),
        })
}
