use crate::app::Result;
use crate::config::ConfigStore;

/// The logged-in identity for this invocation.
///
/// Read once from the config store; writes go through to the store before
/// the cached name changes.
pub struct Session {
    current_user: Option<String>,
    store: Box<dyn ConfigStore>,
}

impl Session {
    pub fn load(store: Box<dyn ConfigStore>) -> Self {
        Self {
            current_user: store.current_user(),
            store,
        }
    }

    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current_user() == Some(name)
    }

    pub fn set_current_user(&mut self, name: &str) -> Result<()> {
        self.store.set_current_user(name)?;
        self.current_user = Some(name.to_string());
        Ok(())
    }
}
