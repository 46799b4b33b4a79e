use serde::Serialize;
use serde_json::{Map, Value};

/// Default inventory when neither the request, the project nor the environment names one
pub const DEFAULT_INVENTORY: &str = "inventory";

/// Environment variable naming the default inventory
pub const INVENTORY_ENV: &str = "MCP_ANSIBLE_INVENTORY";

const META_KEY: &str = "_meta";

/// Parsed `ansible-inventory --list` output.
#[derive(Debug, Clone)]
pub struct Inventory {
    data: Map<String, Value>,
}

/// Summary returned by the `ansible_inventory` tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub hosts: Vec<String>,
    pub groups: Vec<String>,
    pub total_hosts: usize,
    pub total_groups: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostvars: Option<Value>,
}

/// Details for a single host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostDetails {
    pub hostname: String,
    pub groups: Vec<String>,
    pub hostvars: Value,
}

impl Inventory {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        let data = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(Self { data })
    }

    fn hostvars_map(&self) -> Option<&Map<String, Value>> {
        self.data.get(META_KEY)?.get("hostvars")?.as_object()
    }

    /// Every host listed in `_meta.hostvars`
    pub fn hosts(&self) -> Vec<String> {
        self.hostvars_map()
            .map(|vars| vars.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every top-level object key except `_meta`
    pub fn groups(&self) -> Vec<String> {
        self.data
            .iter()
            .filter(|(key, value)| key.as_str() != META_KEY && value.is_object())
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn hostvars(&self) -> Value {
        self.hostvars_map()
            .map(|vars| Value::Object(vars.clone()))
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    pub fn summary(&self, include_hostvars: bool) -> InventorySummary {
        let hosts = self.hosts();
        let groups = self.groups();
        InventorySummary {
            total_hosts: hosts.len(),
            total_groups: groups.len(),
            hosts,
            groups,
            hostvars: include_hostvars.then(|| self.hostvars()),
        }
    }

    /// Look up a host; `None` when it has no entry in `_meta.hostvars`.
    pub fn find_host(&self, hostname: &str) -> Option<HostDetails> {
        let hostvars = self.hostvars_map()?.get(hostname)?.clone();

        let groups = self
            .data
            .iter()
            .filter(|(key, _)| key.as_str() != META_KEY)
            .filter(|(_, group)| {
                group
                    .get("hosts")
                    .and_then(Value::as_array)
                    .is_some_and(|hosts| hosts.iter().any(|h| h.as_str() == Some(hostname)))
            })
            .map(|(key, _)| key.clone())
            .collect();

        Some(HostDetails {
            hostname: hostname.to_string(),
            groups,
            hostvars,
        })
    }
}
