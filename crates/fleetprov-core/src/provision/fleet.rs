// Vehicle registration and campaign scheduling.

use super::names::{
    CAMPAIGN, DECODER_MANIFEST, DECODER_MANIFEST_ACTIVATION, MODEL_MANIFEST, SIGNAL_CATALOG,
    THING, VEHICLE,
};
use crate::error::CoreError;
use crate::model::{
    ActionSpec, AssociationBehavior, Campaign, Guard, LifecycleStatus, ParamValue, PhysicalId,
    ResourceDescriptor, ResourceSpec, SchemaManifests, Vehicle, bind,
};

const SERVICE: &str = "iotfleetwise";

impl ResourceSpec for Vehicle {
    fn describe(&self) -> ResourceDescriptor {
        let manifests = |name: &str| {
            ParamValue::map([
                ("vehicleName", name.into()),
                ("modelManifestArn", bind(MODEL_MANIFEST, "arn")),
                ("decoderManifestArn", bind(DECODER_MANIFEST, "arn")),
            ])
        };
        let mut create = manifests(&self.name);
        if let ParamValue::Map(entries) = &mut create {
            entries.insert(
                "associationBehavior".into(),
                self.association.to_string().into(),
            );
        }

        let mut vehicle = ResourceDescriptor::native(
            VEHICLE,
            ActionSpec::new(SERVICE, "CreateVehicle", create),
        )
        .after(DECODER_MANIFEST_ACTIVATION)
        .with_guard(Guard::RequiresStatus {
            target: MODEL_MANIFEST.into(),
            status: LifecycleStatus::Active,
        })
        .with_guard(Guard::RequiresStatus {
            target: DECODER_MANIFEST.into(),
            status: LifecycleStatus::Active,
        })
        .with_physical_id(PhysicalId::Fixed(self.name.clone()))
        .with_update(ActionSpec::new(SERVICE, "UpdateVehicle", manifests(&self.name)))
        .with_delete(ActionSpec::new(
            SERVICE,
            "DeleteVehicle",
            ParamValue::map([("vehicleName", self.name.as_str().into())]),
        ));

        if self.association == AssociationBehavior::ValidateIotThingExists {
            vehicle = vehicle.after(THING);
        }
        vehicle
    }
}

impl ResourceSpec for Campaign {
    fn describe(&self) -> ResourceDescriptor {
        let mut s3: Vec<(&str, ParamValue)> = vec![
            ("bucketArn", self.destination.bucket_arn.as_str().into()),
            ("dataFormat", "JSON".into()),
        ];
        if let Some(prefix) = &self.destination.prefix {
            s3.push(("prefix", prefix.as_str().into()));
        }

        let signals = ParamValue::list(
            self.signals
                .iter()
                .map(|s| ParamValue::map([("name", s.as_str().into())])),
        );

        ResourceDescriptor::native(
            CAMPAIGN,
            ActionSpec::new(
                SERVICE,
                "CreateCampaign",
                ParamValue::map([
                    ("name", self.name.as_str().into()),
                    ("action", "APPROVE".into()),
                    ("signalCatalogArn", bind(SIGNAL_CATALOG, "arn")),
                    ("targetArn", bind(VEHICLE, "arn")),
                    (
                        "collectionScheme",
                        ParamValue::map([(
                            "timeBasedCollectionScheme",
                            ParamValue::map([("periodMs", self.period_ms.into())]),
                        )]),
                    ),
                    ("compression", self.compression.to_string().into()),
                    ("signalsToCollect", signals),
                    (
                        "dataDestinationConfigs",
                        ParamValue::list([ParamValue::map([("s3Config", ParamValue::map(s3))])]),
                    ),
                ]),
            ),
        )
        .with_physical_id(PhysicalId::Fixed(self.name.clone()))
        .with_delete(ActionSpec::new(
            SERVICE,
            "DeleteCampaign",
            ParamValue::map([("name", self.name.as_str().into())]),
        ))
    }
}

pub fn vehicle_resources(vehicle: &Vehicle) -> Vec<ResourceDescriptor> {
    vec![vehicle.describe()]
}

/// The campaign, after checking its signal selection against the schema.
pub fn campaign_resources(
    campaign: &Campaign,
    schema: &SchemaManifests,
) -> Result<Vec<ResourceDescriptor>, CoreError> {
    campaign.validate(schema)?;
    Ok(vec![campaign.describe()])
}
