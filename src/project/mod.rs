pub mod model;
pub mod session;
pub mod store;

pub use model::{Issue, Project};
pub use session::Designer;
pub use store::{load_project, ProjectStore, ProjectSummary};
