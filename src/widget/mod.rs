//! Customer support chat widget.
//!
//! - [`model`]: transcript entries, severity tiers and input helpers
//! - [`controller`]: validation, requests and state for one widget
//! - [`transport`]: the support endpoints over HTTP or in-process
//! - [`render`]: htmx markup for the web front-end

pub mod controller;
pub mod model;
pub mod render;
pub mod transport;

pub use controller::{ChatWidgetController, SubmitOutcome, WidgetView};
pub use model::{AnalysisField, ChatMessage, Role, Severity, ValidationError};
pub use transport::{
    AnalyzeOutcome, HttpSupportApi, LocalSupportApi, SupportApi, TransportError,
};

/// The widget hosted by the web server.
pub type HostedWidget = ChatWidgetController<LocalSupportApi>;
