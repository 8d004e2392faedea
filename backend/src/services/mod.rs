//! Service layer for the server-side functions.
//!
//! Each service orchestrates repository calls and outbound capabilities
//! (email, AI) and knows nothing about HTTP. Handlers map the service
//! errors onto status codes and response bodies.

pub mod app_links;
pub mod broadcast;
pub mod dispatch_guard;
pub mod email;
pub mod name_extraction;
pub mod teacher_deletion;

pub use app_links::AppSiteAssociation;
pub use broadcast::{dispatch_broadcast, BroadcastError, DispatchOutcome};
pub use dispatch_guard::{DispatchGuard, DispatchPermit};
pub use email::{EmailError, EmailMessage, EmailSender, HttpMailer, LocalMailer};
pub use name_extraction::{
    parse_student_names, ExtractionError, HttpNameExtractor, ImageInput, NameExtractor,
    StaticNameExtractor,
};
pub use teacher_deletion::{delete_teacher, DeletionError, DeletionReport};
