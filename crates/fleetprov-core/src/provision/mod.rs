// ── Provisioners ──
//
// Turn stack settings and schema documents into resource descriptors.
// Every provisioner only declares resources; execution is the
// orchestrator's job.

mod fleet;
mod identity;
mod schema;
mod stack;
mod storage;

pub use fleet::{campaign_resources, vehicle_resources};
pub use identity::identity_resources;
pub use schema::schema_resources;
pub use stack::{Stack, StackOutputs, StackSettings, build_stack};
pub use storage::storage_resources;

/// Logical names of the stack's resources.
pub mod names {
    pub const BUCKET_POLICY: &str = "bucket-policy";
    pub const CREDENTIALS_ROLE: &str = "credentials-role";
    pub const CREDENTIALS_ROLE_POLICY: &str = "credentials-role-policy";
    pub const ROLE_ALIAS: &str = "role-alias";

    pub const CERTIFICATE: &str = "certificate";
    pub const THING: &str = "thing";
    pub const THING_PRINCIPAL_ATTACHMENT: &str = "thing-principal-attachment";
    pub const DEVICE_POLICY: &str = "device-policy";
    pub const POLICY_ATTACHMENT: &str = "policy-attachment";
    pub const CERTIFICATE_SECRET: &str = "certificate-secret";

    pub const SIGNAL_CATALOG: &str = "signal-catalog";
    pub const MODEL_MANIFEST: &str = "model-manifest";
    pub const MODEL_MANIFEST_ACTIVATION: &str = "model-manifest-activation";
    pub const DECODER_MANIFEST: &str = "decoder-manifest";
    pub const DECODER_MANIFEST_ACTIVATION: &str = "decoder-manifest-activation";

    pub const VEHICLE: &str = "vehicle";
    pub const CAMPAIGN: &str = "campaign";
}
