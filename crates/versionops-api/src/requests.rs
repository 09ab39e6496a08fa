//! Request bodies sent to the backend

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of the startup registration call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HostRegistration {
    pub hostname: String,
    /// Address of the interface used to reach the backend
    pub ip_address: String,
    /// Lowercase operating system name, e.g. `linux`
    pub os_type: String,
    pub agent_version: String,
}

/// Body returned by the registration endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    /// Backend-side host identifier
    #[serde(default)]
    pub host_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_field_names() {
        let body = HostRegistration {
            hostname: "web-01".into(),
            ip_address: "10.0.0.5".into(),
            os_type: "linux".into(),
            agent_version: "1.0.0".into(),
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["hostname"], "web-01");
        assert_eq!(json["ip_address"], "10.0.0.5");
        assert_eq!(json["os_type"], "linux");
        assert_eq!(json["agent_version"], "1.0.0");
    }

    #[test]
    fn test_registration_response_host_id_optional() {
        let empty: RegistrationResponse = serde_json::from_str("{}").unwrap();
        let known: RegistrationResponse = serde_json::from_str(r#"{"host_id": "h-42"}"#).unwrap();

        assert!(empty.host_id.is_none());
        assert_eq!(known.host_id.as_deref(), Some("h-42"));
    }
}
