pub mod field;
pub mod format;
pub mod references;
pub mod registry;
pub mod table;
pub mod types;

pub use field::*;
pub use format::FieldFormat;
pub use references::*;
pub use registry::*;
pub use table::*;
pub use types::*;
