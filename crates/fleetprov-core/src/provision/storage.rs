// Bucket access and the credentials-provider role.
//
// The bucket itself is an input. What gets provisioned here is the access
// around it: the telemetry service may list and write objects, and the
// device can exchange its certificate for a role that can write too.

use serde_json::json;

use super::names::{BUCKET_POLICY, CREDENTIALS_ROLE, CREDENTIALS_ROLE_POLICY, ROLE_ALIAS};
use crate::model::{
    ActionSpec, DeviceScope, ParamValue, PhysicalId, PolicyDocument, PolicyStatement,
    ResourceDescriptor, bind,
};

const TELEMETRY_SERVICE: &str = "iotfleetwise.amazonaws.com";
const CREDENTIALS_SERVICE: &str = "credentials.iot.amazonaws.com";
const ROLE_POLICY_NAME: &str = "AllowS3Access";
const CREDENTIAL_DURATION_SECS: u64 = 3600;

/// Bucket policy, role, inline role policy, and role alias.
pub fn storage_resources(scope: &DeviceScope, role_name: &str) -> Vec<ResourceDescriptor> {
    let [bucket_arn, objects_arn] = scope.bucket_resources();
    let service = json!({ "Service": TELEMETRY_SERVICE });

    let bucket_policy_doc = PolicyDocument::new(vec![
        PolicyStatement::allow(["s3:ListBucket"], [bucket_arn.clone()])
            .with_principal(service.clone()),
        PolicyStatement::allow(["s3:PutObject", "s3:GetObject"], [objects_arn.clone()])
            .with_principal(service),
    ]);
    let put_bucket_policy = ActionSpec::new(
        "s3",
        "PutBucketPolicy",
        ParamValue::map([
            ("Bucket", scope.bucket_name.as_str().into()),
            ("Policy", ParamValue::json(bucket_policy_doc.to_value().into())),
        ]),
    );
    let bucket_policy = ResourceDescriptor::native(BUCKET_POLICY, put_bucket_policy.clone())
        .with_physical_id(PhysicalId::Fixed(scope.bucket_name.clone()))
        .with_update(put_bucket_policy)
        .with_delete(ActionSpec::new(
            "s3",
            "DeleteBucketPolicy",
            ParamValue::map([("Bucket", scope.bucket_name.as_str().into())]),
        ));

    let trust = PolicyDocument::new(vec![
        PolicyStatement::allow(["sts:AssumeRole"], Vec::<String>::new())
            .with_principal(json!({ "Service": CREDENTIALS_SERVICE })),
    ]);
    let role = ResourceDescriptor::native(
        CREDENTIALS_ROLE,
        ActionSpec::new(
            "iam",
            "CreateRole",
            ParamValue::map([
                ("RoleName", role_name.into()),
                ("AssumeRolePolicyDocument", ParamValue::json(trust.to_value().into())),
            ]),
        ),
    )
    .with_physical_id(PhysicalId::Field("Role.Arn".into()))
    .with_delete(ActionSpec::new(
        "iam",
        "DeleteRole",
        ParamValue::map([("RoleName", role_name.into())]),
    ));

    let write_access = PolicyDocument::new(vec![PolicyStatement::allow(
        ["s3:PutObject", "s3:PutObjectAcl", "s3:ListBucket"],
        [bucket_arn, objects_arn],
    )]);
    let put_role_policy = ActionSpec::new(
        "iam",
        "PutRolePolicy",
        ParamValue::map([
            ("RoleName", bind(CREDENTIALS_ROLE, "Role.RoleName")),
            ("PolicyName", ROLE_POLICY_NAME.into()),
            ("PolicyDocument", ParamValue::json(write_access.to_value().into())),
        ]),
    );
    let role_policy = ResourceDescriptor::native(CREDENTIALS_ROLE_POLICY, put_role_policy.clone())
        .with_physical_id(PhysicalId::Fixed(format!("{role_name}/{ROLE_POLICY_NAME}")))
        .with_update(put_role_policy)
        .with_delete(ActionSpec::new(
            "iam",
            "DeleteRolePolicy",
            ParamValue::map([
                ("RoleName", role_name.into()),
                ("PolicyName", ROLE_POLICY_NAME.into()),
            ]),
        ));

    let alias_params = ParamValue::map([
        ("roleAlias", scope.role_alias.as_str().into()),
        ("roleArn", bind(CREDENTIALS_ROLE, "Role.Arn")),
        ("credentialDurationSeconds", CREDENTIAL_DURATION_SECS.into()),
    ]);
    let role_alias = ResourceDescriptor::native(
        ROLE_ALIAS,
        ActionSpec::new("iot", "CreateRoleAlias", alias_params.clone()),
    )
    .with_physical_id(PhysicalId::Field("roleAliasArn".into()))
    .with_update(ActionSpec::new("iot", "UpdateRoleAlias", alias_params))
    .with_delete(ActionSpec::new(
        "iot",
        "DeleteRoleAlias",
        ParamValue::map([("roleAlias", scope.role_alias.as_str().into())]),
    ));

    vec![bucket_policy, role, role_policy, role_alias]
}
