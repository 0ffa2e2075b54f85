// Credential & identity provisioning.
//
// Certificate first, then the thing, the attachments, the device policy,
// and finally the secret holding the key material. The secret is the only
// place the private key ever travels to.

use super::names::{
    CERTIFICATE, CERTIFICATE_SECRET, DEVICE_POLICY, POLICY_ATTACHMENT, THING,
    THING_PRINCIPAL_ATTACHMENT,
};
use crate::model::identity::fields;
use crate::model::{
    ActionSpec, IdentityBundle, ParamValue, PhysicalId, PolicyDocument, ResourceDescriptor, bind,
};

/// Descriptors for the device identity, in declaration order.
pub fn identity_resources(
    bundle: &IdentityBundle,
    policy_name: &str,
    policy: &PolicyDocument,
    secret_name: &str,
) -> Vec<ResourceDescriptor> {
    let device = bundle.device_name.as_str();
    let certificate_arn = || ParamValue::Binding(bundle.certificate_arn.clone());

    let certificate = ResourceDescriptor::custom(
        CERTIFICATE,
        ActionSpec::new(
            "iot",
            "CreateKeysAndCertificate",
            ParamValue::map([("setAsActive", true.into())]),
        ),
    )
    .with_physical_id(PhysicalId::Field(fields::CERTIFICATE_ID.into()))
    .sensitive(fields::CERTIFICATE_PEM)
    .sensitive(fields::PRIVATE_KEY)
    .sensitive(fields::PUBLIC_KEY)
    // Active certificates cannot be deleted.
    .before_delete(ActionSpec::new(
        "iot",
        "UpdateCertificate",
        ParamValue::map([
            ("certificateId", bind(CERTIFICATE, fields::CERTIFICATE_ID)),
            ("newStatus", "INACTIVE".into()),
        ]),
    ))
    .with_delete(ActionSpec::new(
        "iot",
        "DeleteCertificate",
        ParamValue::map([
            ("certificateId", bind(CERTIFICATE, fields::CERTIFICATE_ID)),
            ("forceDelete", true.into()),
        ]),
    ));

    let thing_name = ParamValue::map([("thingName", device.into())]);
    let thing = ResourceDescriptor::native(
        THING,
        ActionSpec::new("iot", "CreateThing", thing_name.clone()),
    )
    .with_physical_id(PhysicalId::Fixed(device.to_owned()))
    .with_delete(ActionSpec::new("iot", "DeleteThing", thing_name));

    let principal = ParamValue::map([
        ("thingName", bind(THING, "thingName")),
        ("principal", certificate_arn()),
    ]);
    let thing_attachment = ResourceDescriptor::native(
        THING_PRINCIPAL_ATTACHMENT,
        ActionSpec::new("iot", "AttachThingPrincipal", principal.clone()),
    )
    .with_delete(ActionSpec::new("iot", "DetachThingPrincipal", principal));

    let document = ParamValue::json(policy.to_value().into());
    let device_policy = ResourceDescriptor::native(
        DEVICE_POLICY,
        ActionSpec::new(
            "iot",
            "CreatePolicy",
            ParamValue::map([
                ("policyName", policy_name.into()),
                ("policyDocument", document.clone()),
            ]),
        ),
    )
    .with_physical_id(PhysicalId::Fixed(policy_name.to_owned()))
    .with_update(ActionSpec::new(
        "iot",
        "CreatePolicyVersion",
        ParamValue::map([
            ("policyName", policy_name.into()),
            ("policyDocument", document),
            ("setAsDefault", true.into()),
        ]),
    ))
    .with_delete(ActionSpec::new(
        "iot",
        "DeletePolicy",
        ParamValue::map([("policyName", policy_name.into())]),
    ));

    let attach = ParamValue::map([
        ("policyName", bind(DEVICE_POLICY, "policyName")),
        ("target", certificate_arn()),
    ]);
    let policy_attachment = ResourceDescriptor::native(
        POLICY_ATTACHMENT,
        ActionSpec::new("iot", "AttachPolicy", attach.clone()),
    )
    .after(CERTIFICATE)
    .with_delete(ActionSpec::new("iot", "DetachPolicy", attach));

    let secret = ResourceDescriptor::native(
        CERTIFICATE_SECRET,
        ActionSpec::new(
            "secretsmanager",
            "CreateSecret",
            ParamValue::map([
                ("Name", secret_name.into()),
                ("SecretString", bundle.secret_payload()),
            ]),
        ),
    )
    .after(THING)
    .after(CERTIFICATE)
    .with_physical_id(PhysicalId::Field("ARN".into()))
    .with_delete(ActionSpec::new(
        "secretsmanager",
        "DeleteSecret",
        ParamValue::map([
            ("SecretId", secret_name.into()),
            ("ForceDeleteWithoutRecovery", true.into()),
        ]),
    ));

    vec![
        certificate,
        thing,
        thing_attachment,
        device_policy,
        policy_attachment,
        secret,
    ]
}
