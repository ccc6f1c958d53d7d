//! Password policy filter daemon library
//!
//! A directory server's password-change hook asks this service whether a
//! candidate password may be committed. The answer combines a configurable
//! character policy with a banned-password dictionary; the dictionary is only
//! consulted once the policy accepts.
//!
//! # Protocol
//!
//! Over a loopback TCP connection the client sends `test\n<password>\n` and
//! receives `true\n` or `false\n`, after which the connection is closed.
//!
//! # Environment Variables
//!
//! See [`config`] for the paths and server settings read at startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pwd_filter::{PasswordFilter, PolicyConfig, Server, ServerSettings, WordList};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn start() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = PolicyConfig::load("./opfrules.properties")?;
//! let dictionary = WordList::load("./opfdict.txt")?;
//! let filter = PasswordFilter::new(Arc::new(policy), Arc::new(dictionary));
//!
//! Server::new(filter, ServerSettings::default())
//!     .run(CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;

// Internal modules
mod dictionary;
mod evaluator;
mod filter;
mod policy;
mod protocol;
mod sections;
mod server;

// Public API
pub use config::ServerSettings;
pub use dictionary::{Dictionary, DictionaryError, EmptyDictionary, WordList};
pub use evaluator::{RejectReason, Verdict, check_password, evaluate_password};
pub use filter::PasswordFilter;
pub use policy::{LineFault, PolicyConfig, RulesError};
pub use protocol::{ConnectionError, Response, TEST_COMMAND};
pub use server::{Exchange, Server, ServerError};
