use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct AddRequest<'a> {
    pub host_prefix: &'a str,
    pub target: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddResponse {
    pub hostname: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RandomRequest<'a> {
    pub target: &'a str,
}

/// A single registered vhost, as returned by `list`/`list_host`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ListHost {
    pub name: String,
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default)]
    pub hosts: Vec<ListHost>,
}
