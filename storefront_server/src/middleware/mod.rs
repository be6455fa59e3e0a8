mod acl;
mod signature;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use signature::{SignatureScheme, WebhookSignatureFactory, WebhookSignatureService};
