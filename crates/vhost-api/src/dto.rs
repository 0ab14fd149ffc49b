use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    #[serde(default)]
    pub host_prefix: String,
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct AddResponse {
    pub hostname: String,
}

#[derive(Debug, Deserialize)]
pub struct RandomRequest {
    #[serde(default)]
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct ListHost {
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub hosts: Vec<ListHost>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl From<vhost_gateway::Host> for ListHost {
    fn from(host: vhost_gateway::Host) -> Self {
        ListHost {
            name: host.name,
            uri: host.uri.to_string(),
        }
    }
}
