//! Pipeline coordination and its two outbound seams: credentials and
//! notification delivery.

pub mod coordinator;
pub mod credentials;
pub mod notify;

pub use coordinator::{Extraction, PipelineCoordinator, RunReport};
pub use credentials::{
    CredentialProvider, EnvCredentialProvider, SessionCredentials, StaticCredentialProvider,
};
pub use notify::{Notification, Notifier, StreamNotifier, WebhookNotifier};
