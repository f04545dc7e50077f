//! `ProfileMatcher`: resolves a request's user-agent/manufacturer/model
//! triple to a single [`DeviceProfile`], per §4.4.

use crate::models::DeviceProfile;
use crate::store::ProfileStore;

pub struct ProfileMatcher<S: ProfileStore> {
    store: S,
}

impl<S: ProfileStore> ProfileMatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolves the profile for this request: the first non-wildcard
    /// profile whose match condition holds, else the wildcard default, else
    /// a constructed fallback.
    pub fn resolve(
        &self,
        user_agent: &str,
        manufacturer: Option<&str>,
        model_name: Option<&str>,
    ) -> DeviceProfile {
        let profiles = self.store.list();

        if let Some(found) = profiles
            .iter()
            .find(|p| !p.is_wildcard() && p.matches_request(user_agent, manufacturer, model_name))
        {
            return found.clone();
        }

        if let Some(default) = profiles.iter().find(|p| p.is_wildcard()) {
            return default.clone();
        }

        DeviceProfile::fallback()
    }
}
