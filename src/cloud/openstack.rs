//! OpenStack adapter over the REST APIs.
//!
//! Authenticates once with Keystone v3 (password auth, project scope) and
//! talks to Neutron for networks, security groups and ports, and to Nova
//! for keypairs and servers. Endpoints come from the token's catalog.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{OvercastError, Result};
use crate::stack::RuleSpec;

use super::{BackendError, BackendResult, CloudBackend, NodeRequest, ResourceSummary};

const DEFAULT_DOMAIN: &str = "Default";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Keystone credentials, usually read from `OS_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenStackCredentials {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub user_domain_name: String,
    pub project_domain_name: String,
    pub region_name: Option<String>,
}

impl OpenStackCredentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let require = |name: &str| {
            get(name).ok_or_else(|| OvercastError::validation(format!("{} is not set", name)))
        };

        let project_name = match get("OS_PROJECT_NAME").or_else(|| get("OS_TENANT_NAME")) {
            Some(project) => project,
            None => {
                return Err(OvercastError::validation(
                    "OS_PROJECT_NAME (or OS_TENANT_NAME) is not set",
                ))
            }
        };

        Ok(Self {
            auth_url: require("OS_AUTH_URL")?,
            username: require("OS_USERNAME")?,
            password: require("OS_PASSWORD")?,
            project_name,
            user_domain_name: get("OS_USER_DOMAIN_NAME")
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            project_domain_name: get("OS_PROJECT_DOMAIN_NAME")
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            region_name: get("OS_REGION_NAME"),
        })
    }

    fn token_url(&self) -> String {
        let base = self.auth_url.trim_end_matches('/');
        if base.ends_with("/v3") {
            format!("{}/auth/tokens", base)
        } else {
            format!("{}/v3/auth/tokens", base)
        }
    }

    fn auth_body(&self) -> Value {
        json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": self.username,
                            "domain": { "name": self.user_domain_name },
                            "password": self.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": self.project_name,
                        "domain": { "name": self.project_domain_name },
                    }
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Token,
}

#[derive(Debug, Deserialize)]
struct Token {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<Endpoint>,
}

#[derive(Debug, Deserialize)]
struct Endpoint {
    interface: String,
    url: String,
    #[serde(default)]
    region_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

impl Endpoint {
    fn in_region(&self, region: Option<&str>) -> bool {
        match region {
            None => true,
            Some(r) => {
                self.region_id.as_deref() == Some(r) || self.region.as_deref() == Some(r)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Listed {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

impl From<Listed> for ResourceSummary {
    fn from(item: Listed) -> Self {
        ResourceSummary {
            id: item.id,
            name: item.name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeypairEntry {
    keypair: KeypairName,
}

#[derive(Debug, Deserialize)]
struct KeypairName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ServerAddress {
    addr: String,
    #[serde(default)]
    version: Option<u8>,
    #[serde(rename = "OS-EXT-IPS:type", default)]
    kind: Option<String>,
}

/// [`CloudBackend`] talking to a live OpenStack cloud.
pub struct OpenStackBackend {
    client: Client,
    token: String,
    network_url: String,
    compute_url: String,
}

impl OpenStackBackend {
    /// Authenticate and look up the network and compute endpoints.
    pub fn connect(credentials: &OpenStackCredentials) -> BackendResult<Self> {
        let client = Client::builder()
            .user_agent("overcast")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::new("authenticate", 0, e.to_string()))?;

        let url = credentials.token_url();
        debug!("Authenticating as {} at {}", credentials.username, url);
        let response = check(
            "authenticate",
            client.post(&url).json(&credentials.auth_body()).send(),
        )?;

        let token = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                BackendError::new("authenticate", 0, "response carried no X-Subject-Token")
            })?;
        let body: TokenResponse = parse("authenticate", response)?;

        let region = credentials.region_name.as_deref();
        let network = find_endpoint(&body.token.catalog, "network", region)?;
        let compute = find_endpoint(&body.token.catalog, "compute", region)?;

        let network_url = {
            let base = network.trim_end_matches('/');
            if base.ends_with("/v2.0") {
                base.to_string()
            } else {
                format!("{}/v2.0", base)
            }
        };
        let compute_url = compute.trim_end_matches('/').to_string();
        debug!("Network endpoint {}, compute endpoint {}", network_url, compute_url);

        Ok(Self {
            client,
            token,
            network_url,
            compute_url,
        })
    }

    fn network(&self, path: &str) -> String {
        format!("{}{}", self.network_url, path)
    }

    fn compute(&self, path: &str) -> String {
        format!("{}{}", self.compute_url, path)
    }

    fn send(&self, operation: &str, request: RequestBuilder) -> BackendResult<Response> {
        check(operation, request.header("X-Auth-Token", &self.token).send())
    }

    fn post<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
        body: Value,
    ) -> BackendResult<T> {
        debug!("POST {}", url);
        let response = self.send(operation, self.client.post(url).json(&body))?;
        parse(operation, response)
    }

    fn get<T: DeserializeOwned>(&self, operation: &str, url: &str) -> BackendResult<T> {
        debug!("GET {}", url);
        let response = self.send(operation, self.client.get(url))?;
        parse(operation, response)
    }

    fn delete(&self, operation: &str, url: &str) -> BackendResult<()> {
        debug!("DELETE {}", url);
        self.send(operation, self.client.delete(url))?;
        Ok(())
    }

    fn list(&self, operation: &str, url: &str, key: &str) -> BackendResult<Vec<ResourceSummary>> {
        let body: Value = self.get(operation, url)?;
        let items: Vec<Listed> = field(operation, body, key)?;
        Ok(items.into_iter().map(ResourceSummary::from).collect())
    }
}

fn check(operation: &str, sent: reqwest::Result<Response>) -> BackendResult<Response> {
    let response = sent.map_err(|e| BackendError::new(operation, 0, e.to_string()))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(BackendError::new(
        operation,
        status.as_u16(),
        provider_message(&body),
    ))
}

fn field<T: DeserializeOwned>(operation: &str, mut body: Value, key: &str) -> BackendResult<T> {
    let inner = body.get_mut(key).map(Value::take).unwrap_or(Value::Null);
    serde_json::from_value(inner)
        .map_err(|e| BackendError::new(operation, 0, format!("unexpected response: {}", e)))
}

fn parse<T: DeserializeOwned>(operation: &str, response: Response) -> BackendResult<T> {
    response
        .json()
        .map_err(|e| BackendError::new(operation, 0, format!("unexpected response: {}", e)))
}

/// Pull the human message out of a Neutron or Nova error body.
///
/// Both wrap it one level down: `{"NeutronError": {"message": ..}}`,
/// `{"itemNotFound": {"message": .., "code": 404}}`.
fn provider_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(Value::as_object)
        .and_then(|outer| {
            outer
                .values()
                .find_map(|inner| inner.get("message").and_then(Value::as_str))
        })
        .map(String::from)
        .unwrap_or_else(|| body.trim().to_string())
}

fn find_endpoint(
    catalog: &[CatalogEntry],
    service_type: &str,
    region: Option<&str>,
) -> BackendResult<String> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == service_type)
        .flat_map(|entry| entry.endpoints.iter())
        .find(|ep| ep.interface == "public" && ep.in_region(region))
        .map(|ep| ep.url.clone())
        .ok_or_else(|| {
            BackendError::new(
                "authenticate",
                0,
                format!("no public {} endpoint in the service catalog", service_type),
            )
        })
}

/// Floating address first, then the first IPv4 address.
fn pick_address(addresses: &serde_json::Map<String, Value>) -> Option<String> {
    let all: Vec<ServerAddress> = addresses
        .values()
        .filter_map(|v| serde_json::from_value::<Vec<ServerAddress>>(v.clone()).ok())
        .flatten()
        .collect();

    all.iter()
        .find(|a| a.kind.as_deref() == Some("floating"))
        .or_else(|| all.iter().find(|a| a.version.unwrap_or(4) == 4))
        .map(|a| a.addr.clone())
}

impl CloudBackend for OpenStackBackend {
    fn create_network(&self, name: &str, cidr: &str) -> BackendResult<String> {
        let body: Value = self.post(
            "create_network",
            &self.network("/networks"),
            json!({ "network": { "name": name, "admin_state_up": true } }),
        )?;
        let network: Created = field("create_network", body, "network")?;

        self.post::<Value>(
            "create_subnet",
            &self.network("/subnets"),
            json!({
                "subnet": {
                    "name": name,
                    "network_id": network.id,
                    "ip_version": 4,
                    "cidr": cidr,
                }
            }),
        )?;

        Ok(network.id)
    }

    fn create_security_group(&self, name: &str, rules: &[RuleSpec]) -> BackendResult<String> {
        let body: Value = self.post(
            "create_security_group",
            &self.network("/security-groups"),
            json!({ "security_group": { "name": name, "description": name } }),
        )?;
        let group: Created = field("create_security_group", body, "security_group")?;

        for rule in rules {
            self.post::<Value>(
                "create_security_group_rule",
                &self.network("/security-group-rules"),
                json!({
                    "security_group_rule": {
                        "security_group_id": group.id,
                        "direction": "ingress",
                        "ethertype": "IPv4",
                        "protocol": rule.protocol,
                        "port_range_min": rule.from_port,
                        "port_range_max": rule.to_port,
                        "remote_ip_prefix": rule.cidr,
                    }
                }),
            )?;
        }

        Ok(group.id)
    }

    fn create_port(
        &self,
        name: &str,
        network_id: &str,
        security_group_ids: &[String],
    ) -> BackendResult<String> {
        let body: Value = self.post(
            "create_port",
            &self.network("/ports"),
            json!({
                "port": {
                    "name": name,
                    "network_id": network_id,
                    "security_groups": security_group_ids,
                }
            }),
        )?;
        let port: Created = field("create_port", body, "port")?;
        Ok(port.id)
    }

    fn create_keypair(&self, name: &str, public_key: &str) -> BackendResult<()> {
        self.post::<Value>(
            "create_keypair",
            &self.compute("/os-keypairs"),
            json!({ "keypair": { "name": name, "public_key": public_key } }),
        )?;
        Ok(())
    }

    fn create_node(&self, request: &NodeRequest) -> BackendResult<String> {
        let bd = &request.block_device;
        let mut server = json!({
            "name": request.name,
            "imageRef": "",
            "flavorRef": request.flavor_id,
            "block_device_mapping_v2": [{
                "uuid": bd.source_image,
                "source_type": "image",
                "destination_type": "volume",
                "volume_size": bd.volume_size_gb,
                "delete_on_termination": bd.delete_on_termination,
                "boot_index": bd.boot_index,
            }],
            "networks": request
                .port_ids
                .iter()
                .map(|id| json!({ "port": id }))
                .collect::<Vec<_>>(),
        });
        if let Some(keypair) = &request.keypair {
            server["key_name"] = json!(keypair);
        }
        if let Some(user_data) = &request.user_data {
            server["user_data"] = json!(STANDARD.encode(user_data.as_bytes()));
        }

        let body: Value = self.post(
            "create_node",
            &self.compute("/servers"),
            json!({ "server": server }),
        )?;
        let created: Created = field("create_node", body, "server")?;
        Ok(created.id)
    }

    fn node_address(&self, node_id: &str) -> BackendResult<Option<String>> {
        let url = self.compute(&format!("/servers/{}", node_id));
        let body: Value = self.get("node_address", &url)?;
        Ok(body["server"]["addresses"]
            .as_object()
            .and_then(pick_address))
    }

    fn list_networks(&self) -> BackendResult<Vec<ResourceSummary>> {
        self.list("list_networks", &self.network("/networks"), "networks")
    }

    fn list_security_groups(&self) -> BackendResult<Vec<ResourceSummary>> {
        self.list(
            "list_security_groups",
            &self.network("/security-groups"),
            "security_groups",
        )
    }

    fn list_ports(&self) -> BackendResult<Vec<ResourceSummary>> {
        self.list("list_ports", &self.network("/ports"), "ports")
    }

    fn list_keypairs(&self) -> BackendResult<Vec<ResourceSummary>> {
        let body: Value = self.get("list_keypairs", &self.compute("/os-keypairs"))?;
        let entries: Vec<KeypairEntry> = field("list_keypairs", body, "keypairs")?;
        Ok(entries
            .into_iter()
            .map(|e| ResourceSummary {
                id: e.keypair.name.clone(),
                name: e.keypair.name,
            })
            .collect())
    }

    fn list_nodes(&self) -> BackendResult<Vec<ResourceSummary>> {
        self.list("list_nodes", &self.compute("/servers"), "servers")
    }

    fn delete_network(&self, id: &str) -> BackendResult<()> {
        self.delete("delete_network", &self.network(&format!("/networks/{}", id)))
    }

    fn delete_security_group(&self, id: &str) -> BackendResult<()> {
        self.delete(
            "delete_security_group",
            &self.network(&format!("/security-groups/{}", id)),
        )
    }

    fn delete_port(&self, id: &str) -> BackendResult<()> {
        self.delete("delete_port", &self.network(&format!("/ports/{}", id)))
    }

    fn delete_keypair(&self, name: &str) -> BackendResult<()> {
        self.delete(
            "delete_keypair",
            &self.compute(&format!("/os-keypairs/{}", name)),
        )
    }

    fn delete_node(&self, id: &str) -> BackendResult<()> {
        self.delete("delete_node", &self.compute(&format!("/servers/{}", id)))
    }
}
