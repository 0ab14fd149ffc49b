use std::fmt;
use std::str::FromStr;

use http::Uri;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Newtype around [`http::Uri`] so it can be carried in [`Host`] and
/// serialized as a plain JSON string, matching the wire format the control
/// plane and config file both use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VhostUri(Uri);

impl VhostUri {
    pub fn as_uri(&self) -> &Uri {
        &self.0
    }
}

impl FromStr for VhostUri {
    type Err = http::uri::InvalidUri;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(VhostUri(Uri::from_str(s)?))
    }
}

impl fmt::Display for VhostUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uri> for VhostUri {
    fn from(uri: Uri) -> Self {
        VhostUri(uri)
    }
}

impl Serialize for VhostUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for VhostUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UriVisitor;
        impl<'de> Visitor<'de> for UriVisitor {
            type Value = VhostUri;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-empty URI string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v.is_empty() {
                    return Err(de::Error::invalid_value(de::Unexpected::Str(v), &self));
                }
                VhostUri::from_str(v).map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_str(UriVisitor)
    }
}

/// A registered virtual host: the `Host` header value clients present, and
/// the upstream base URI requests for it are forwarded to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub name: String,
    pub uri: VhostUri,
}

impl Host {
    pub fn new(name: impl Into<String>, uri: VhostUri) -> Self {
        Self {
            name: name.into(),
            uri,
        }
    }
}
