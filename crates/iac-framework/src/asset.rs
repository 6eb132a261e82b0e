//! Assets and archives.
//!
//! Both travel as signature-tagged wire objects. A payload the decoder does not recognize
//! becomes the `Invalid` variant instead of failing the conversion, so state written by
//! older engines keeps loading.

use crate::error::{Error, Result};
use crate::serialization::value::Value;
use crate::serialization::wire::{ARCHIVE_SIG, ASSET_SIG, SPECIAL_SIG_KEY};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    File(String),
    String(String),
    Remote(String),
    /// Marks a payload that could not be decoded.
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Archive {
    Assets(BTreeMap<String, AssetOrArchive>),
    File(String),
    Remote(String),
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetOrArchive {
    Asset(Asset),
    Archive(Archive),
}

impl From<Asset> for AssetOrArchive {
    fn from(asset: Asset) -> Self {
        AssetOrArchive::Asset(asset)
    }
}

impl From<Archive> for AssetOrArchive {
    fn from(archive: Archive) -> Self {
        AssetOrArchive::Archive(archive)
    }
}

fn signed(sig: &str, key: &str, value: Value) -> Value {
    Value::object([
        (SPECIAL_SIG_KEY, Value::from(sig)),
        (key, value),
    ])
}

impl Asset {
    pub fn to_value(&self) -> Result<Value> {
        match self {
            Asset::File(path) => Ok(signed(ASSET_SIG, "path", Value::from(path.as_str()))),
            Asset::String(text) => Ok(signed(ASSET_SIG, "text", Value::from(text.as_str()))),
            Asset::Remote(uri) => Ok(signed(ASSET_SIG, "uri", Value::from(uri.as_str()))),
            Asset::Invalid => Err(Error::Conversion {
                context: "asset".to_string(),
                reason: "cannot serialize an invalid asset".to_string(),
            }),
        }
    }

    fn decode(map: &BTreeMap<String, Value>) -> Option<Asset> {
        let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        field("path")
            .map(Asset::File)
            .or_else(|| field("text").map(Asset::String))
            .or_else(|| field("uri").map(Asset::Remote))
    }
}

impl Archive {
    pub fn to_value(&self) -> Result<Value> {
        match self {
            Archive::Assets(assets) => {
                let mut entries = BTreeMap::new();
                for (name, entry) in assets {
                    entries.insert(name.clone(), entry.to_value()?);
                }
                Ok(signed(ARCHIVE_SIG, "assets", Value::Object(entries)))
            }
            Archive::File(path) => Ok(signed(ARCHIVE_SIG, "path", Value::from(path.as_str()))),
            Archive::Remote(uri) => Ok(signed(ARCHIVE_SIG, "uri", Value::from(uri.as_str()))),
            Archive::Invalid => Err(Error::Conversion {
                context: "archive".to_string(),
                reason: "cannot serialize an invalid archive".to_string(),
            }),
        }
    }

    fn decode(map: &BTreeMap<String, Value>) -> Option<Archive> {
        if let Some(Value::Object(assets)) = map.get("assets") {
            let mut entries = BTreeMap::new();
            for (name, entry) in assets {
                let Value::Object(entry) = entry else {
                    return None;
                };
                entries.insert(name.clone(), AssetOrArchive::decode(entry)?);
            }
            return Some(Archive::Assets(entries));
        }
        let field = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
        field("path")
            .map(Archive::File)
            .or_else(|| field("uri").map(Archive::Remote))
    }
}

impl AssetOrArchive {
    pub fn to_value(&self) -> Result<Value> {
        match self {
            AssetOrArchive::Asset(asset) => asset.to_value(),
            AssetOrArchive::Archive(archive) => archive.to_value(),
        }
    }

    /// Decodes a signature-tagged object. Returns `None` when the object is not an asset or
    /// archive, or when its payload is malformed.
    pub fn decode(map: &BTreeMap<String, Value>) -> Option<AssetOrArchive> {
        match map.get(SPECIAL_SIG_KEY).and_then(Value::as_str)? {
            ASSET_SIG => Asset::decode(map).map(AssetOrArchive::Asset),
            ARCHIVE_SIG => Archive::decode(map).map(AssetOrArchive::Archive),
            _ => None,
        }
    }
}
