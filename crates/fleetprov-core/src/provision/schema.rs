// Schema & decode pipeline provisioning.
//
// Each manifest goes absent -> DRAFT on creation and DRAFT -> ACTIVE
// through a separate activation resource. The decoder manifest is only
// created once the model manifest is active.

use serde_json::Value;

use super::names::{
    DECODER_MANIFEST, DECODER_MANIFEST_ACTIVATION, MODEL_MANIFEST, MODEL_MANIFEST_ACTIVATION,
    SIGNAL_CATALOG,
};
use crate::model::{
    ActionSpec, DecoderManifest, Guard, LifecycleStatus, ModelManifest, ParamValue, PhysicalId,
    ResourceDescriptor, ResourceSpec, SchemaManifests, SignalCatalog, bind,
};

const SERVICE: &str = "iotfleetwise";

fn to_param<T: serde::Serialize>(value: &T) -> ParamValue {
    serde_json::to_value(value).unwrap_or(Value::Null).into()
}

fn by_name(name: &str) -> ParamValue {
    ParamValue::map([("name", name.into())])
}

impl ResourceSpec for SignalCatalog {
    fn describe(&self) -> ResourceDescriptor {
        let mut params: Vec<(&str, ParamValue)> = vec![("name", self.name.as_str().into())];
        if let Some(description) = &self.description {
            params.push(("description", description.as_str().into()));
        }
        params.push(("nodes", to_param(&self.nodes)));

        ResourceDescriptor::custom(
            SIGNAL_CATALOG,
            ActionSpec::new(SERVICE, "CreateSignalCatalog", ParamValue::map(params)),
        )
        .with_physical_id(PhysicalId::Fixed(self.name.clone()))
        .with_delete(ActionSpec::new(SERVICE, "DeleteSignalCatalog", by_name(&self.name)))
    }
}

impl ResourceSpec for ModelManifest {
    fn describe(&self) -> ResourceDescriptor {
        ResourceDescriptor::native(
            MODEL_MANIFEST,
            ActionSpec::new(
                SERVICE,
                "CreateModelManifest",
                ParamValue::map([
                    ("name", self.name.as_str().into()),
                    ("signalCatalogArn", bind(SIGNAL_CATALOG, "arn")),
                    ("nodes", to_param(&self.nodes)),
                ]),
            ),
        )
        .with_physical_id(PhysicalId::Fixed(self.name.clone()))
        .with_initial_status(LifecycleStatus::Draft)
        .with_delete(ActionSpec::new(SERVICE, "DeleteModelManifest", by_name(&self.name)))
    }
}

impl ResourceSpec for DecoderManifest {
    fn describe(&self) -> ResourceDescriptor {
        ResourceDescriptor::custom(
            DECODER_MANIFEST,
            ActionSpec::new(
                SERVICE,
                "CreateDecoderManifest",
                ParamValue::map([
                    ("name", self.name.as_str().into()),
                    ("modelManifestArn", bind(MODEL_MANIFEST, "arn")),
                    ("networkInterfaces", to_param(&self.network_interfaces)),
                    ("signalDecoders", to_param(&self.signal_decoders)),
                ]),
            ),
        )
        .after(MODEL_MANIFEST)
        .after(MODEL_MANIFEST_ACTIVATION)
        .with_guard(Guard::RequiresStatus {
            target: MODEL_MANIFEST.into(),
            status: LifecycleStatus::Active,
        })
        .with_physical_id(PhysicalId::Fixed(self.name.clone()))
        .with_initial_status(LifecycleStatus::Draft)
        .with_delete(ActionSpec::new(SERVICE, "DeleteDecoderManifest", by_name(&self.name)))
    }
}

/// Activation of a manifest: a separate call from its creation.
fn activation(
    name: &str,
    target: &str,
    action: &str,
    manifest: &str,
    status: LifecycleStatus,
) -> ResourceDescriptor {
    ResourceDescriptor::custom(
        name,
        ActionSpec::new(
            SERVICE,
            action,
            ParamValue::map([
                ("name", bind(target, "name")),
                ("status", status.to_string().into()),
            ]),
        ),
    )
    .with_physical_id(PhysicalId::Fixed(format!("{manifest}/status")))
    .with_guard(Guard::Transition {
        target: target.to_owned(),
        to: status,
    })
}

/// Catalog, model manifest, decoder manifest, and their activations.
pub fn schema_resources(schema: &SchemaManifests) -> Vec<ResourceDescriptor> {
    vec![
        schema.catalog.describe(),
        schema.model.describe(),
        activation(
            MODEL_MANIFEST_ACTIVATION,
            MODEL_MANIFEST,
            "UpdateModelManifest",
            &schema.model.name,
            schema.model.status,
        ),
        schema.decoder.describe(),
        activation(
            DECODER_MANIFEST_ACTIVATION,
            DECODER_MANIFEST,
            "UpdateDecoderManifest",
            &schema.decoder.name,
            schema.decoder.status,
        ),
    ]
}
