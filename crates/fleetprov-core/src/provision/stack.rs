// ── Stack assembly ──
//
// Combines every provisioner into one plan. All validation (documents,
// campaign signals, graph shape) happens here, before any remote call.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::names::CERTIFICATE;
use super::{
    campaign_resources, identity_resources, schema_resources, storage_resources,
    vehicle_resources,
};
use crate::error::CoreError;
use crate::graph::{GraphBuilder, Plan};
use crate::loader::SchemaDocuments;
use crate::model::{
    AssociationBehavior, Campaign, Compression, DecoderManifest, DeviceScope, IdentityBundle,
    LifecycleStatus, ModelManifest, PolicyDocument, S3Destination, SchemaManifests,
    SignalCatalog, Vehicle,
};

/// Everything that parameterizes the stack apart from the schema documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSettings {
    pub account: String,
    pub region: String,
    pub device_name: String,
    pub bucket_name: String,
    pub bucket_prefix: Option<String>,
    pub role_name: String,
    pub role_alias: String,
    pub policy_name: String,
    pub secret_name: String,
    pub catalog_name: String,
    pub model_manifest_name: String,
    pub decoder_manifest_name: String,
    pub campaign_name: String,
    pub model_nodes: Vec<String>,
    pub campaign_signals: Vec<String>,
    pub period_ms: u64,
    pub compression: Compression,
    pub association: AssociationBehavior,
}

impl StackSettings {
    /// Defaults for the ROS2 camera demo in `account`/`region`.
    pub fn new(account: &str, region: &str) -> Self {
        let device_name = "vehicle-ros2-test".to_owned();
        Self {
            account: account.to_owned(),
            region: region.to_owned(),
            bucket_name: format!("vision-system-data-{account}-{region}"),
            bucket_prefix: None,
            role_name: "CredentialsProviderRole".into(),
            role_alias: "CredentialsProviderRoleAlias".into(),
            policy_name: "IotCorePolicy".into(),
            secret_name: format!("{device_name}-certificate"),
            catalog_name: "DefaultSignalCatalog".into(),
            model_manifest_name: "Ros2ModelManifest".into(),
            decoder_manifest_name: "Ros2DecoderManifest".into(),
            campaign_name: "Ros2Campaign".into(),
            model_nodes: [
                "Vehicle.Cameras.Front.Image",
                "Vehicle.Speed",
                "Vehicle.Temperature",
                "Vehicle.Acceleration",
            ]
            .map(String::from)
            .to_vec(),
            campaign_signals: [
                "Vehicle.Cameras.Front.Image",
                "Vehicle.Speed",
                "Vehicle.Acceleration",
            ]
            .map(String::from)
            .to_vec(),
            period_ms: 10_000,
            compression: Compression::Snappy,
            association: AssociationBehavior::ValidateIotThingExists,
            device_name,
        }
    }

    pub fn device_scope(&self) -> DeviceScope {
        DeviceScope {
            region: self.region.clone(),
            account: self.account.clone(),
            device_name: self.device_name.clone(),
            bucket_name: self.bucket_name.clone(),
            role_alias: self.role_alias.clone(),
        }
    }

    /// The three manifests, built from the loaded documents.
    pub fn manifests(&self, documents: &SchemaDocuments) -> SchemaManifests {
        SchemaManifests {
            catalog: SignalCatalog {
                name: self.catalog_name.clone(),
                description: Some("Signal catalog for ROS2".into()),
                nodes: documents.nodes.clone(),
            },
            model: ModelManifest {
                name: self.model_manifest_name.clone(),
                nodes: self.model_nodes.clone(),
                status: LifecycleStatus::Active,
            },
            decoder: DecoderManifest {
                name: self.decoder_manifest_name.clone(),
                network_interfaces: documents.network_interfaces.clone(),
                signal_decoders: documents.signal_decoders.clone(),
                status: LifecycleStatus::Active,
            },
        }
    }

    pub fn campaign(&self) -> Campaign {
        Campaign {
            name: self.campaign_name.clone(),
            period_ms: self.period_ms,
            compression: self.compression,
            destination: S3Destination {
                bucket_arn: self.device_scope().bucket_arn(),
                prefix: self.bucket_prefix.clone(),
            },
            signals: self.campaign_signals.clone(),
        }
    }

    pub fn outputs(&self) -> StackOutputs {
        StackOutputs {
            bucket_name: self.bucket_name.clone(),
            role_alias: self.role_alias.clone(),
            vehicle_name: self.device_name.clone(),
            secret_name: self.secret_name.clone(),
        }
    }
}

/// Named values exported for operators and downstream automation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackOutputs {
    pub bucket_name: String,
    pub role_alias: String,
    pub vehicle_name: String,
    pub secret_name: String,
}

/// A validated stack, ready to run.
#[derive(Debug, Clone)]
pub struct Stack {
    pub plan: Plan,
    pub schema: SchemaManifests,
    pub outputs: StackOutputs,
}

/// Validate the inputs and assemble the full resource graph.
pub fn build_stack(
    settings: &StackSettings,
    documents: &SchemaDocuments,
) -> Result<Stack, CoreError> {
    let schema = settings.manifests(documents);
    schema.validate()?;
    let campaign = settings.campaign();

    let scope = settings.device_scope();
    let policy = PolicyDocument::for_device(&scope);
    if !policy.is_self_scoped(&settings.device_name) {
        return Err(CoreError::ValidationFailed {
            message: format!(
                "device policy grants topics outside '{}'",
                settings.device_name
            ),
        });
    }
    let bundle = IdentityBundle::issued_by(CERTIFICATE, &settings.device_name);
    let vehicle = Vehicle {
        name: settings.device_name.clone(),
        association: settings.association,
    };

    let mut graph = GraphBuilder::new();
    for descriptor in storage_resources(&scope, &settings.role_name)
        .into_iter()
        .chain(identity_resources(
            &bundle,
            &settings.policy_name,
            &policy,
            &settings.secret_name,
        ))
        .chain(schema_resources(&schema))
        .chain(vehicle_resources(&vehicle))
        .chain(campaign_resources(&campaign, &schema)?)
    {
        graph.add(descriptor);
    }

    let plan = graph.build()?;
    debug!(resources = plan.len(), "stack assembled");

    Ok(Stack {
        plan,
        schema,
        outputs: settings.outputs(),
    })
}
