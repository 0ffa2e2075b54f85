// ── Remote provisioning API seam ──
//
// The engine talks to the control plane through `RemoteApi` so it can be
// driven by the HTTP client in production and by in-memory fakes in tests.

use std::future::Future;

use fleetprov_api::{ApiCall, ControlPlaneClient, TlsMode, TransportConfig};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::info;

use crate::config::{ControlPlaneConfig, TlsVerification};
use crate::error::CoreError;

/// Anything that can execute a single provisioning action.
pub trait RemoteApi: Send + Sync {
    fn invoke(
        &self,
        call: &ApiCall,
    ) -> impl Future<Output = Result<Value, fleetprov_api::Error>> + Send;
}

impl RemoteApi for ControlPlaneClient {
    fn invoke(
        &self,
        call: &ApiCall,
    ) -> impl Future<Output = Result<Value, fleetprov_api::Error>> + Send {
        ControlPlaneClient::invoke(self, call)
    }
}

impl<T: RemoteApi> RemoteApi for &T {
    fn invoke(
        &self,
        call: &ApiCall,
    ) -> impl Future<Output = Result<Value, fleetprov_api::Error>> + Send {
        (**self).invoke(call)
    }
}

/// Refuses every call. Lets `plan` and `preview` run without credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl RemoteApi for Offline {
    fn invoke(
        &self,
        call: &ApiCall,
    ) -> impl Future<Output = Result<Value, fleetprov_api::Error>> + Send {
        std::future::ready(Err(fleetprov_api::Error::AccessDenied {
            service: call.service.clone(),
            action: call.action.clone(),
            message: "no control-plane connection in offline mode".into(),
        }))
    }
}

/// Build an HTTP client from the runtime configuration.
pub fn connect(config: &ControlPlaneConfig) -> Result<ControlPlaneClient, CoreError> {
    if config.token.expose_secret().is_empty() {
        return Err(CoreError::Config {
            message: "no API token configured".into(),
        });
    }

    let transport = TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    };

    let client = ControlPlaneClient::new(config.endpoint.clone(), &config.token, &transport)?;
    info!(endpoint = %config.endpoint, "control plane client ready");
    Ok(client)
}
