// ── Access policy documents ──
//
// IAM-style JSON policies. The device policy grants a connecting identity
// rights over its own topics only: every topic ARN embeds the device name.

use serde::{Deserialize, Serialize};

const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// One statement of a policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    pub action: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<serde_json::Value>,
}

impl PolicyStatement {
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            action: actions.into_iter().map(Into::into).collect(),
            resource: resources.into_iter().map(Into::into).collect(),
            principal: None,
        }
    }

    pub fn with_principal(mut self, principal: serde_json::Value) -> Self {
        self.principal = Some(principal);
        self
    }
}

/// A complete policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_owned(),
            statement,
        }
    }

    /// Device policy for the identity described by `scope`.
    pub fn for_device(scope: &DeviceScope) -> Self {
        let iot = scope.iot_arn_prefix();
        let device = &scope.device_name;
        let vehicle_topics = format!("$aws/iotfleetwise/vehicles/{device}");
        let jobs = format!("$aws/things/{device}/jobs/*");
        let commands = format!("$aws/commands/things/{device}/executions/*");

        Self::new(vec![
            PolicyStatement::allow(["iot:Connect"], [format!("{iot}:client/{device}")]),
            PolicyStatement::allow(
                ["iot:Publish"],
                [
                    format!("{iot}:topic/{vehicle_topics}/checkins"),
                    format!("{iot}:topic/{vehicle_topics}/signals"),
                ],
            ),
            PolicyStatement::allow(
                ["iot:Subscribe"],
                [
                    format!("{iot}:topicfilter/{vehicle_topics}/*"),
                    format!("{iot}:topicfilter/{jobs}"),
                    format!("{iot}:topicfilter/{commands}"),
                ],
            ),
            PolicyStatement::allow(
                ["iot:Receive"],
                [
                    format!("{iot}:topic/{vehicle_topics}/*"),
                    format!("{iot}:topic/{jobs}"),
                    format!("{iot}:topic/{commands}"),
                ],
            ),
            PolicyStatement::allow(
                ["s3:PutObject", "s3:PutObjectAcl", "s3:ListBucket"],
                scope.bucket_resources(),
            ),
            PolicyStatement::allow(
                ["iot:AssumeRoleWithCertificate"],
                [format!("{iot}:rolealias/{}", scope.role_alias)],
            ),
        ])
    }

    /// `true` when every topic-like resource is scoped to `device`.
    pub fn is_self_scoped(&self, device: &str) -> bool {
        const TOPIC_KINDS: [&str; 3] = [":topic/", ":topicfilter/", ":client/"];
        self.statement
            .iter()
            .flat_map(|s| s.resource.iter())
            .filter(|r| TOPIC_KINDS.iter().any(|k| r.contains(k)))
            .all(|r| r.split('/').any(|segment| segment == device))
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Everything the device policy is parameterized by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceScope {
    pub region: String,
    pub account: String,
    pub device_name: String,
    pub bucket_name: String,
    pub role_alias: String,
}

impl DeviceScope {
    fn iot_arn_prefix(&self) -> String {
        format!("arn:aws:iot:{}:{}", self.region, self.account)
    }

    pub fn bucket_arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.bucket_name)
    }

    /// The bucket and every object in it.
    pub fn bucket_resources(&self) -> [String; 2] {
        let bucket = self.bucket_arn();
        let objects = format!("{bucket}/*");
        [bucket, objects]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scope() -> DeviceScope {
        DeviceScope {
            region: "eu-central-1".into(),
            account: "123456789012".into(),
            device_name: "vehicle-ros2-test".into(),
            bucket_name: "vision-system-data-123456789012-eu-central-1".into(),
            role_alias: "vehicle-ros2-test-role-alias".into(),
        }
    }

    #[test]
    fn device_policy_is_scoped_to_its_own_identity() {
        let doc = PolicyDocument::for_device(&scope());
        assert!(doc.is_self_scoped("vehicle-ros2-test"));
        assert!(!doc.is_self_scoped("some-other-vehicle"));
    }

    #[test]
    fn device_policy_covers_every_capability_class() {
        let doc = PolicyDocument::for_device(&scope());
        let actions: Vec<&str> = doc
            .statement
            .iter()
            .flat_map(|s| s.action.iter().map(String::as_str))
            .collect();
        for expected in [
            "iot:Connect",
            "iot:Publish",
            "iot:Subscribe",
            "iot:Receive",
            "s3:PutObject",
            "iot:AssumeRoleWithCertificate",
        ] {
            assert!(actions.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn serializes_with_pascal_case_keys() {
        let value = PolicyDocument::for_device(&scope()).to_value();
        assert_eq!(value["Version"], "2012-10-17");
        assert_eq!(value["Statement"][0]["Effect"], "Allow");
        assert_eq!(
            value["Statement"][0]["Resource"][0],
            "arn:aws:iot:eu-central-1:123456789012:client/vehicle-ros2-test"
        );
        assert!(value["Statement"][0].get("Principal").is_none());
    }
}
