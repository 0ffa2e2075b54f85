// ── Domain model ──
//
// Resource descriptors and the typed documents they are built from. Nothing
// in here performs I/O; the loader reads documents and the provisioners turn
// them into descriptors.

pub mod fleet;
pub mod identity;
pub mod param;
pub mod policy;
pub mod resource;
pub mod schema;

// ── Re-exports ──────────────────────────────────────────────────────

pub use fleet::{AssociationBehavior, Campaign, Compression, S3Destination, Vehicle};
pub use identity::IdentityBundle;
pub use param::{BindingSource, FieldPath, ParamValue, ResponseBinding, TemplatePart, View, bind};
pub use policy::{DeviceScope, Effect, PolicyDocument, PolicyStatement};
pub use resource::{
    ActionSpec, Guard, LifecycleStatus, PhysicalId, ResourceDescriptor, ResourceKind, ResourceSpec,
};
pub use schema::{
    CatalogNode, DecoderManifest, ModelManifest, NetworkInterface, NodeBody, SchemaManifests,
    SignalCatalog, SignalDecoder,
};
