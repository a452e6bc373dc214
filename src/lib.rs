pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod formula;
pub mod ident;
pub mod logging;
pub mod project;
pub mod schema;

pub use cli::{Cli, Commands};
pub use config::DesignerConfig;
pub use error::{DesignError, Result};
pub use events::{ChangeEvent, DesignerObserver, SilentObserver};
pub use formula::{FormulaBuilder, FormulaToken, TokenKind};
pub use ident::Transliterator;
pub use project::{Designer, Project, ProjectStore};
