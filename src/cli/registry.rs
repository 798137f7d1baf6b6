use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::app::{AppContext, GatorError, Result};
use crate::cli::middleware;
use crate::cli::Command;
use crate::domain::User;

/// How many positional arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtMost(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtMost(n) => count <= n,
            Arity::Any => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match self {
            Arity::Exactly(n) => write!(f, "exactly {} argument{}", n, plural(*n)),
            Arity::AtMost(n) => write!(f, "at most {} argument{}", n, plural(*n)),
            Arity::Any => write!(f, "any number of arguments"),
        }
    }
}

/// A command that runs without a logged-in user.
///
/// `run` is only called with an argument count that `arity` accepts.
#[async_trait]
pub trait Handler: Send + Sync {
    fn arity(&self) -> Arity {
        Arity::Any
    }

    fn usage(&self) -> &'static str;

    async fn run(&self, ctx: &mut AppContext, cmd: &Command) -> Result<()>;
}

/// A command that needs the current user resolved first.
#[async_trait]
pub trait AuthenticatedHandler: Send + Sync {
    fn arity(&self) -> Arity {
        Arity::Any
    }

    fn usage(&self) -> &'static str;

    async fn run(&self, ctx: &mut AppContext, cmd: &Command, user: &User) -> Result<()>;
}

pub enum Registration {
    Public(Box<dyn Handler>),
    Authenticated(Box<dyn AuthenticatedHandler>),
}

impl Registration {
    fn arity(&self) -> Arity {
        match self {
            Registration::Public(h) => h.arity(),
            Registration::Authenticated(h) => h.arity(),
        }
    }

    fn usage(&self) -> &'static str {
        match self {
            Registration::Public(h) => h.usage(),
            Registration::Authenticated(h) => h.usage(),
        }
    }

    pub fn requires_login(&self) -> bool {
        matches!(self, Registration::Authenticated(_))
    }
}

/// Maps command names to handlers.
///
/// Dispatch checks argument count, then resolves the user for authenticated
/// commands, then runs the handler. Handler errors come back unchanged.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Registration>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `registration` under `name`, replacing any earlier entry.
    pub fn register(&mut self, name: &str, registration: Registration) {
        self.handlers.insert(name.to_string(), registration);
    }

    pub fn register_public<H: Handler + 'static>(&mut self, name: &str, handler: H) {
        self.register(name, Registration::Public(Box::new(handler)));
    }

    pub fn register_authenticated<H: AuthenticatedHandler + 'static>(
        &mut self,
        name: &str,
        handler: H,
    ) {
        self.register(name, Registration::Authenticated(Box::new(handler)));
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn run(&self, ctx: &mut AppContext, cmd: &Command) -> Result<()> {
        let registration = self
            .handlers
            .get(&cmd.name)
            .ok_or_else(|| GatorError::UnknownCommand(cmd.name.clone()))?;

        let arity = registration.arity();
        if !arity.accepts(cmd.args.len()) {
            return Err(GatorError::Argument {
                command: cmd.name.clone(),
                arity,
                usage: registration.usage(),
            });
        }

        tracing::debug!("Dispatching {} with {} args", cmd.name, cmd.args.len());
        match registration {
            Registration::Public(handler) => handler.run(ctx, cmd).await,
            Registration::Authenticated(handler) => {
                let user = middleware::resolve_user(ctx)?;
                handler.run(ctx, cmd, &user).await
            }
        }
    }
}
