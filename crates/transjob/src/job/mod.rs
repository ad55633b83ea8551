//! Translation job entity, its units and the status state machine.

pub mod model;
pub mod request;
pub mod set;
pub mod status;

pub use model::{ContentField, ContentItem, TranslationJob, TranslationUnit};
pub use request::JobRequest;
pub use set::{PickedSite, Site, TranslationSet};
pub use status::JobStatus;
