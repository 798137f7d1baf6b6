pub mod context;
pub mod error;
pub mod session;

pub use context::AppContext;
pub use error::{GatorError, Result};
pub use session::Session;
