//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::{
    AppSiteAssociation, DispatchGuard, EmailSender, LocalMailer, NameExtractor,
    StaticNameExtractor,
};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for store operations
    pub repository: Arc<dyn FullRepository>,
    /// Outbound email for broadcasts
    pub mailer: Arc<dyn EmailSender>,
    /// Image-to-names extraction
    pub extractor: Arc<dyn NameExtractor>,
    /// Broadcasts currently being dispatched by this process
    pub dispatch_guard: DispatchGuard,
    /// Served at `/.well-known/apple-app-site-association`
    pub app_links: Arc<AppSiteAssociation>,
}

impl AppState {
    /// Create a state around `repository` with in-memory outbound services.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self {
            repository,
            mailer: Arc::new(LocalMailer::new()),
            extractor: Arc::new(StaticNameExtractor::replying("[]")),
            dispatch_guard: DispatchGuard::new(),
            app_links: Arc::new(AppSiteAssociation::for_app(
                crate::config::AppLinkSettings::default().app_id,
            )),
        }
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn EmailSender>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn NameExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_links = Arc::new(AppSiteAssociation::for_app(app_id));
        self
    }
}
