//! Server registry: name -> connection parameters + static admin list.
//!
//! The file form is a map keyed by server name, YAML or JSON:
//!
//! ```yaml
//! rush:
//!   ip: 10.0.0.12
//!   port: 9100
//!   password: hunter2
//!   admins: [123456789012345678]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::caller::IdentityId;
use crate::error::{Result, WardenError};

#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(skip)]
    pub name: String,
    #[serde(alias = "ip")]
    pub address: String,
    pub port: u16,
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(default, alias = "admins")]
    pub admin_identities: HashSet<IdentityId>,
}

impl ServerConfig {
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn is_admin(&self, id: &IdentityId) -> bool {
        self.admin_identities.contains(id)
    }
}

// Keep the secret out of logs.
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("admins", &self.admin_identities.len())
            .finish_non_exhaustive()
    }
}

pub trait ServerRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Result<&ServerConfig>;

    /// Registered server names, sorted.
    fn list_names(&self) -> Vec<String>;
}

/// Registry loaded once and never mutated afterwards.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    servers: BTreeMap<String, ServerConfig>,
}

impl StaticRegistry {
    pub fn new(servers: impl IntoIterator<Item = ServerConfig>) -> Self {
        Self {
            servers: servers.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// Load from a `.yaml`/`.yml` or JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WardenError::Registry(format!("failed to read {}: {e}", path.display()))
        })?;
        let lower = path.to_string_lossy().to_ascii_lowercase();
        if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            Self::from_yaml_str(&raw)
        } else {
            Self::from_json_str(&raw)
        }
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let parsed: BTreeMap<String, ServerConfig> = serde_yaml::from_str(raw)
            .map_err(|e| WardenError::Registry(format!("invalid YAML: {e}")))?;
        Self::from_entries(parsed)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: BTreeMap<String, ServerConfig> = serde_json::from_str(raw)
            .map_err(|e| WardenError::Registry(format!("invalid JSON: {e}")))?;
        Self::from_entries(parsed)
    }

    fn from_entries(parsed: BTreeMap<String, ServerConfig>) -> Result<Self> {
        let mut servers = BTreeMap::new();
        for (name, mut cfg) in parsed {
            let name = name.trim().to_string();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(WardenError::Registry(format!("invalid server name: {name:?}")));
            }
            if cfg.address.trim().is_empty() {
                return Err(WardenError::Registry(format!("server `{name}` has no address")));
            }
            cfg.name = name.clone();
            servers.insert(name, cfg);
        }
        Ok(Self { servers })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl ServerRegistry for StaticRegistry {
    fn lookup(&self, name: &str) -> Result<&ServerConfig> {
        self.servers
            .get(name)
            .ok_or_else(|| WardenError::ServerNotFound {
                server_name: name.to_string(),
            })
    }

    fn list_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
snd:
  ip: 10.0.0.13
  port: 9101
  password: other
rush:
  ip: 10.0.0.12
  port: 9100
  password: hunter2
  admins: [123456789012345678, "42"]
"#;

    #[test]
    fn yaml_registry_loads_aliases() {
        let reg = StaticRegistry::from_yaml_str(YAML).unwrap();
        assert_eq!(reg.len(), 2);
        let rush = reg.lookup("rush").unwrap();
        assert_eq!(rush.name, "rush");
        assert_eq!(rush.endpoint(), "10.0.0.12:9100");
        assert_eq!(rush.secret, "hunter2");
        assert!(rush.is_admin(&IdentityId::new("42")));
        assert!(rush.is_admin(&IdentityId::new("123456789012345678")));
        assert!(reg.lookup("snd").unwrap().admin_identities.is_empty());
    }

    #[test]
    fn json_registry_accepts_canonical_keys() {
        let reg = StaticRegistry::from_json_str(
            r#"{"rush":{"address":"127.0.0.1","port":9100,"secret":"s","admin_identities":[1]}}"#,
        )
        .unwrap();
        assert!(reg.lookup("rush").unwrap().is_admin(&IdentityId::new("1")));
    }

    #[test]
    fn names_are_sorted() {
        let reg = StaticRegistry::from_yaml_str(YAML).unwrap();
        assert_eq!(reg.list_names(), vec!["rush".to_string(), "snd".to_string()]);
    }

    #[test]
    fn unknown_server_is_not_found() {
        let reg = StaticRegistry::from_yaml_str(YAML).unwrap();
        let err = reg.lookup("koth").unwrap_err();
        assert!(matches!(err, WardenError::ServerNotFound { server_name } if server_name == "koth"));
    }

    #[test]
    fn debug_output_hides_secret() {
        let reg = StaticRegistry::from_yaml_str(YAML).unwrap();
        let dbg = format!("{:?}", reg.lookup("rush").unwrap());
        assert!(!dbg.contains("hunter2"));
    }

    #[test]
    fn whitespace_in_name_rejected() {
        let err = StaticRegistry::from_yaml_str("\"my server\":\n  ip: a\n  port: 1\n  password: p\n")
            .unwrap_err();
        assert!(err.to_string().contains("invalid server name"));
    }
}
