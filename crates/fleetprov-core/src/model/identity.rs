// Device identity material, by reference.
//
// The bundle never holds key material itself. Each field is a binding into
// the certificate issuance response, so the PEMs only exist in memory for
// the duration of the run that issued them.

use super::param::{ParamValue, ResponseBinding};

/// Response fields of `CreateKeysAndCertificate`.
pub mod fields {
    pub const CERTIFICATE_PEM: &str = "certificatePem";
    pub const PRIVATE_KEY: &str = "keyPair.PrivateKey";
    pub const PUBLIC_KEY: &str = "keyPair.PublicKey";
    pub const CERTIFICATE_ID: &str = "certificateId";
    pub const CERTIFICATE_ARN: &str = "certificateArn";
}

/// A device identity and the certificate issued to it.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityBundle {
    /// Thing name; unique within the target account and region.
    pub device_name: String,
    pub certificate: ResponseBinding,
    pub private_key: ResponseBinding,
    pub certificate_id: ResponseBinding,
    pub certificate_arn: ResponseBinding,
}

impl IdentityBundle {
    /// Bundle for a certificate issued by the resource named `issuer`.
    pub fn issued_by(issuer: &str, device_name: &str) -> Self {
        Self {
            device_name: device_name.to_owned(),
            certificate: ResponseBinding::new(issuer, fields::CERTIFICATE_PEM),
            private_key: ResponseBinding::new(issuer, fields::PRIVATE_KEY),
            certificate_id: ResponseBinding::new(issuer, fields::CERTIFICATE_ID),
            certificate_arn: ResponseBinding::new(issuer, fields::CERTIFICATE_ARN),
        }
    }

    /// Secret-store payload: `{"privateKey": ..., "certificate": ...}`
    /// encoded as a JSON string.
    pub fn secret_payload(&self) -> ParamValue {
        ParamValue::json(ParamValue::map([
            ("privateKey", ParamValue::Binding(self.private_key.clone())),
            ("certificate", ParamValue::Binding(self.certificate.clone())),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_payload_binds_both_pems() {
        let bundle = IdentityBundle::issued_by("certificate", "vehicle-ros2-test");
        let payload = bundle.secret_payload();
        let sources: Vec<String> = payload.bindings().iter().map(|b| b.to_string()).collect();
        assert_eq!(
            sources,
            vec![
                "certificate.keyPair.PrivateKey".to_owned(),
                "certificate.certificatePem".to_owned()
            ]
        );
    }
}
