//! XML encoding of structured group payloads

use serde::de::DeserializeOwned;
use serde::Serialize;

use ncgroups_core::{ClientError, Result};

/// Serialize `value` to an XML element named after its (serde) type name
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    quick_xml::se::to_string(value).map_err(ClientError::Encode)
}

/// Deserialize an XML reply body into `T`
pub fn decode<T: DeserializeOwned>(xml: &str) -> Result<T> {
    quick_xml::de::from_str(xml.trim()).map_err(ClientError::Decode)
}
