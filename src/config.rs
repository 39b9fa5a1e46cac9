use serde::{Deserialize, Serialize};

use crate::registry::Zone;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Streets monitored from startup; more can be registered at runtime.
    #[serde(default)]
    pub locations: Vec<LocationEntry>,
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
    /// The provider blocks default client user agents.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_check_interval_minutes")]
    pub check_interval_minutes: u64,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LocationEntry {
    pub street: String,
    #[serde(default)]
    pub zone: Option<Zone>,
}

fn default_provider_url() -> String {
    "https://www.cmteb.ro/functionare_sistem_termoficare.php".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_check_interval_minutes() -> u64 {
    30
}

fn default_api_port() -> u16 {
    3000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: MonitorConfig = serde_json::from_str("{}").unwrap();
        assert!(config.locations.is_empty());
        assert_eq!(config.check_interval_minutes, 30);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.api_port, 3000);
        assert!(config.provider_url.starts_with("https://www.cmteb.ro/"));
    }

    #[test]
    fn locations_parse_with_optional_zone() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{
                "locations": [
                    { "street": "Calea Victoriei", "zone": "centru" },
                    { "street": "Strada Lunga" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[0].zone, Some(Zone::Centru));
        assert_eq!(config.locations[1].zone, None);
    }
}
