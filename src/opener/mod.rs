//! Generate commands for opening paths and URIs in the default system handler.
//!
//! These functions return [`std::process::Command`] instances that can be run
//! immediately to open the target, or adjusted first to use different
//! stdin/stdout/stderr streams.
//!
//! <https://dwheeler.com/essays/open-files-urls.html> was used as a reference.

pub mod error;
pub mod handler;
pub mod locate;
pub mod platform;
pub mod target;

pub use error::{Error, Result};
pub use handler::{parse_handlers, HandlerCommand};
pub use locate::{Locate, WhichLocator};
pub use platform::SystemHandler;
pub use target::PathOrUri;

use std::process::Command;
use tracing::{debug, trace};

/// The environment variable checked when opening in a web browser
pub const BROWSER_ENV: &str = "BROWSER";
/// The environment variable checked when opening in a text editor
pub const EDITOR_ENV: &str = "EDITOR";

/// Configuration for an [`Opener`]
#[derive(Debug, Clone)]
pub struct OpenerConfig {
    /// Variable consulted by [`Opener::open_browser`]
    pub browser_env: String,

    /// Variable consulted by [`Opener::open_editor`]
    pub editor_env: String,

    /// Handler used when no environment handler applies
    pub system: SystemHandler,
}

impl Default for OpenerConfig {
    fn default() -> Self {
        Self {
            browser_env: BROWSER_ENV.to_string(),
            editor_env: EDITOR_ENV.to_string(),
            system: SystemHandler::current(),
        }
    }
}

impl OpenerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_browser_env(mut self, env: impl Into<String>) -> Self {
        self.browser_env = env.into();
        self
    }

    pub fn with_editor_env(mut self, env: impl Into<String>) -> Self {
        self.editor_env = env.into();
        self
    }

    pub fn with_system_handler(mut self, system: SystemHandler) -> Self {
        self.system = system;
        self
    }
}

/// Builds open commands, checking that the chosen program exists first
#[derive(Debug, Clone, Default)]
pub struct Opener<L = WhichLocator> {
    config: OpenerConfig,
    locator: L,
}

impl Opener<WhichLocator> {
    /// Create an opener that looks programs up on `PATH`
    pub fn new(config: OpenerConfig) -> Self {
        Self::with_locator(config, WhichLocator)
    }
}

impl<L: Locate> Opener<L> {
    /// Create an opener with a custom executable locator
    pub fn with_locator(config: OpenerConfig, locator: L) -> Self {
        Self { config, locator }
    }

    pub fn config(&self) -> &OpenerConfig {
        &self.config
    }

    /// Open the target in the system handler, ignoring environment handlers
    ///
    /// # Errors
    /// See [`Error`].
    pub fn open<T>(&self, target: T) -> Result
    where
        PathOrUri: From<T>,
    {
        self.system_command(&PathOrUri::from(target))
    }

    /// Open the target with the configured browser variable, falling back to
    /// the system handler when it is unset or empty
    ///
    /// # Errors
    /// See [`Error`].
    pub fn open_browser<T>(&self, target: T) -> Result
    where
        PathOrUri: From<T>,
    {
        self.open_env(&self.config.browser_env, &PathOrUri::from(target))
    }

    /// Open the target with the configured editor variable, falling back to
    /// the system handler when it is unset or empty
    ///
    /// # Errors
    /// See [`Error`].
    pub fn open_editor<T>(&self, target: T) -> Result
    where
        PathOrUri: From<T>,
    {
        self.open_env(&self.config.editor_env, &PathOrUri::from(target))
    }

    /// Open the target with the handler named by `env`
    ///
    /// # Errors
    /// - [`Error::EmptyHandler`] if the value names no program
    /// - [`Error::NotFound`] if none of the listed programs exist
    pub fn open_env(&self, env: &str, target: &PathOrUri) -> Result {
        trace!("checking if {} exists in environment", env);

        let value = match std::env::var(env) {
            Ok(value) if !value.is_empty() => value,
            _ => {
                trace!("{} not set, using system default handler", env);
                return self.system_command(target);
            }
        };
        trace!("found {} = {}", env, value);

        let handlers = parse_handlers(&value);
        let first = handlers.first().ok_or_else(|| Error::EmptyHandler {
            env: env.to_string(),
        })?;

        for handler in &handlers {
            match self.locator.locate(&handler.program) {
                Ok(_) => {
                    debug!("opening {} with {} (from {})", target, handler.program, env);
                    return Ok(handler.command(target));
                }
                Err(e) => trace!("{} candidate {} unavailable: {}", env, handler.program, e),
            }
        }

        // Report the first candidate, the one the user most likely meant
        self.ensure_command(&first.program)?;
        Ok(first.command(target))
    }

    fn system_command(&self, target: &PathOrUri) -> Result {
        let system = self.config.system;
        self.ensure_command(system.program())?;
        debug!("opening {} with {}", target, system.program());
        system.command(target)
    }

    fn ensure_command(&self, program: &str) -> Result<()> {
        trace!("checking if executable \"{}\" exists", program);
        self.locator
            .locate(program)
            .map(|_| ())
            .map_err(|source| Error::NotFound {
                exe: program.to_string(),
                source,
            })
    }
}

/// Open the target in the default system handler.
///
/// Environment variables that tell CLI apps what to use are ignored; see
/// [`open_browser`] and [`open_editor`] to honour them.
///
/// # Errors
/// See [`Error`].
pub fn open<T>(target: T) -> Result
where
    PathOrUri: From<T>,
{
    Opener::new(OpenerConfig::default()).open(target)
}

/// Open the target in the browser named by [`BROWSER_ENV`], or the system
/// handler if it isn't set.
///
/// # Errors
/// See [`Error`].
pub fn open_browser<T>(target: T) -> Result
where
    PathOrUri: From<T>,
{
    Opener::new(OpenerConfig::default()).open_browser(target)
}

/// Open the target in the editor named by [`EDITOR_ENV`], or the system
/// handler if it isn't set.
///
/// # Errors
/// See [`Error`].
pub fn open_editor<T>(target: T) -> Result
where
    PathOrUri: From<T>,
{
    Opener::new(OpenerConfig::default()).open_editor(target)
}

/// Render a command as a single line for display
pub fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
