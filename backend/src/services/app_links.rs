//! Apple app-site-association descriptor.
//!
//! Lets iOS open subscription and payment callback links in the app instead
//! of the browser.

use serde::Serialize;

/// Paths handed to the app, payment-provider callbacks included.
pub const ASSOCIATED_PATHS: [&str; 3] = [
    "/teacher/subscription/success*",
    "/teacher/subscription/error*",
    "/payment-callback*",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSiteAssociation {
    pub applinks: AppLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppLinks {
    pub apps: Vec<String>,
    pub details: Vec<AppLinkDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppLinkDetail {
    #[serde(rename = "appID")]
    pub app_id: String,
    pub paths: Vec<String>,
}

impl AppSiteAssociation {
    pub fn for_app(app_id: impl Into<String>) -> Self {
        Self {
            applinks: AppLinks {
                apps: Vec::new(),
                details: vec![AppLinkDetail {
                    app_id: app_id.into(),
                    paths: ASSOCIATED_PATHS.iter().map(|p| p.to_string()).collect(),
                }],
            },
        }
    }
}
