// Vehicles and data-collection campaigns.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::schema::SchemaManifests;
use crate::error::CoreError;

/// Whether vehicle registration checks for, or creates, the device identity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum AssociationBehavior {
    /// Fail closed if the identity does not already exist.
    #[default]
    ValidateIotThingExists,
    CreateIotThing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    /// Same as the device name.
    pub name: String,
    pub association: AssociationBehavior,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Compression {
    Off,
    #[default]
    Snappy,
}

/// Where collected data lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Destination {
    pub bucket_arn: String,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub name: String,
    pub period_ms: u64,
    pub compression: Compression,
    pub destination: S3Destination,
    /// Fully qualified catalog node names.
    pub signals: Vec<String>,
}

impl Campaign {
    /// Every selected signal must exist in the catalog and be reachable from
    /// the model manifest the target vehicle is registered with.
    pub fn validate(&self, schema: &SchemaManifests) -> Result<(), CoreError> {
        if self.signals.is_empty() {
            return Err(CoreError::ValidationFailed {
                message: format!("campaign '{}' selects no signals", self.name),
            });
        }
        if self.period_ms == 0 {
            return Err(CoreError::ValidationFailed {
                message: format!("campaign '{}' has a zero collection period", self.name),
            });
        }
        for signal in &self.signals {
            if !schema.catalog.contains(signal) || !schema.model.reaches(signal) {
                return Err(CoreError::SignalOutsideCatalog {
                    campaign: self.name.clone(),
                    signal: signal.clone(),
                });
            }
        }
        Ok(())
    }
}
