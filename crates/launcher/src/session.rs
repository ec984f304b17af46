//! Boundary to the simulated-endpoint logic.
//!
//! The launcher does not know what a simulated endpoint does; it only hands
//! each worker a device model, a serial number and the target URL, and
//! expects exactly one terminal outcome back. [`HttpSession`] is the bundled
//! collaborator: a single check-in request against the management server.

use crate::identity::SerialNumber;
use fleetsim_model::DeviceModel;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Errors from one endpoint session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The request to the management server failed in transit.
    #[error("endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The management server rejected the session.
    #[error("endpoint returned status {status}")]
    Rejected { status: u16 },

    /// Collaborator-defined failure.
    #[error("session failed: {0}")]
    Failed(String),
}

/// The opaque simulated-endpoint logic run by each worker.
///
/// Implementations receive the shared read-only device model, the worker's
/// unique serial and the target URL, run to completion, and report exactly
/// one terminal outcome.
pub trait Session: Send + Sync + 'static {
    fn run(
        &self,
        model: Arc<DeviceModel>,
        serial: SerialNumber,
        url: String,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Check-in payload sent to the management server.
#[derive(Debug, Serialize)]
struct CheckIn {
    serial_number: String,
    manufacturer: Option<String>,
    software_version: Option<String>,
    parameter_count: usize,
}

impl CheckIn {
    fn new(model: &DeviceModel, serial: SerialNumber) -> Self {
        Self {
            serial_number: serial.to_string(),
            manufacturer: leaf_by_suffix(model, ".DeviceInfo.Manufacturer"),
            software_version: leaf_by_suffix(model, ".DeviceInfo.SoftwareVersion"),
            parameter_count: model.len(),
        }
    }
}

/// Find a leaf value by path suffix, so both `Device.` and
/// `InternetGatewayDevice.` rooted models resolve.
fn leaf_by_suffix(model: &DeviceModel, suffix: &str) -> Option<String> {
    model
        .iter()
        .find(|(path, _)| path.ends_with(suffix))
        .and_then(|(_, entry)| entry.value())
        .map(str::to_string)
}

/// Minimal endpoint session: one JSON check-in POST to the target URL.
#[derive(Debug, Clone, Default)]
pub struct HttpSession {
    client: reqwest::Client,
}

impl HttpSession {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Session for HttpSession {
    fn run(
        &self,
        model: Arc<DeviceModel>,
        serial: SerialNumber,
        url: String,
    ) -> impl Future<Output = Result<(), SessionError>> + Send {
        let client = self.client.clone();
        async move {
            let body = CheckIn::new(&model, serial);
            let response = client.post(url).json(&body).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(SessionError::Rejected {
                    status: status.as_u16(),
                });
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_pulls_device_info_leaves() {
        let model = DeviceModel::from_tabular(
            "\
Parameter,Object,Writable,Value,Value type
InternetGatewayDevice.,true,false,,
InternetGatewayDevice.DeviceInfo.Manufacturer,false,false,fleetsim,xsd:string
InternetGatewayDevice.DeviceInfo.SoftwareVersion,false,false,1.0.2,xsd:string
",
        )
        .unwrap();

        let check_in = CheckIn::new(&model, SerialNumber(7));
        assert_eq!(check_in.serial_number, "000007");
        assert_eq!(check_in.manufacturer.as_deref(), Some("fleetsim"));
        assert_eq!(check_in.software_version.as_deref(), Some("1.0.2"));
        assert_eq!(check_in.parameter_count, 3);
    }
}
