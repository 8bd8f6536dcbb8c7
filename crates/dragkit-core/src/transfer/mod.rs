//! Payload capability offered by a drag source.
//!
//! The core never encodes payloads itself. It only lists flavors, asks
//! whether one is supported and fetches the data for it.

mod flavor_map;
mod proxy;

pub use flavor_map::{FlavorMap, SystemFlavorMap};
pub use proxy::TransferProxy;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DndError, DndResult};

/// MIME prefix of flavors carrying a live object.
pub const SERIALIZED_OBJECT_MIME: &str = "application/x-serialized-object";

/// How the data of a flavor is represented in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    Bytes,
    Text,
    Object,
}

/// Descriptor of one data representation a payload can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataFlavor {
    mime_type: String,
    representation: Representation,
}

impl DataFlavor {
    /// Create a flavor with an explicit representation.
    pub fn new(mime_type: impl Into<String>, representation: Representation) -> Self {
        Self {
            mime_type: mime_type.into(),
            representation,
        }
    }

    /// Infer the representation from the MIME type.
    pub fn parse(mime_type: &str) -> Self {
        let primary = mime_type.split(';').next().unwrap_or_default().trim();
        let representation = if primary == SERIALIZED_OBJECT_MIME {
            Representation::Object
        } else if primary.starts_with("text/") {
            Representation::Text
        } else {
            Representation::Bytes
        };
        Self::new(mime_type.trim(), representation)
    }

    /// UTF-8 plain text.
    pub fn plain_text() -> Self {
        Self::new("text/plain; charset=utf-8", Representation::Text)
    }

    /// Live object of the named type.
    pub fn object(type_name: &str) -> Self {
        Self::new(format!("{}; class={}", SERIALIZED_OBJECT_MIME, type_name), Representation::Object)
    }

    /// Full MIME type, including parameters.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// MIME type without parameters.
    pub fn primary_type(&self) -> &str {
        self.mime_type.split(';').next().unwrap_or_default().trim()
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    /// Whether the flavor hands out a live object that a local receiver
    /// should get a private copy of.
    pub fn is_serialized_object(&self) -> bool {
        self.representation == Representation::Object && self.primary_type() == SERIALIZED_OBJECT_MIME
    }
}

impl fmt::Display for DataFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime_type)
    }
}

/// A live object carried by a payload.
pub trait TransferObject: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    /// Produce an independent copy of the object.
    ///
    /// `None` means the object has no copy capability and must be shared by
    /// reference.
    fn deep_copy(&self) -> Option<Arc<dyn TransferObject>> {
        None
    }
}

/// Object whose copy is made by a JSON encode/decode round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct SerdeObject<T>(pub T);

impl<T> TransferObject for SerdeObject<T>
where
    T: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn deep_copy(&self) -> Option<Arc<dyn TransferObject>> {
        let encoded = match serde_json::to_vec(&self.0) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::debug!("Object encode failed, sharing original: {}", e);
                return None;
            }
        };
        match serde_json::from_slice::<T>(&encoded) {
            Ok(decoded) => Some(Arc::new(SerdeObject(decoded))),
            Err(e) => {
                log::debug!("Object decode failed, sharing original: {}", e);
                None
            }
        }
    }
}

/// Data produced for one flavor.
#[derive(Debug, Clone)]
pub enum TransferData {
    Bytes(Vec<u8>),
    Text(String),
    Object(Arc<dyn TransferObject>),
}

impl TransferData {
    /// Wrap a serializable value as a copyable object.
    pub fn object<T>(value: T) -> Self
    where
        T: Serialize + DeserializeOwned + fmt::Debug + Send + Sync + 'static,
    {
        Self::Object(Arc::new(SerdeObject(value)))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<dyn TransferObject>> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow the object as a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_object().and_then(|object| object.as_any().downcast_ref::<T>())
    }
}

/// Payload capability: the data a drag source offers.
pub trait Transferable: Send + Sync {
    /// Flavors the payload can produce, most preferred first.
    fn flavors(&self) -> Vec<DataFlavor>;

    /// Whether `flavor` can be fetched.
    fn supports(&self, flavor: &DataFlavor) -> bool {
        self.flavors().contains(flavor)
    }

    /// Produce the data for `flavor`.
    fn fetch(&self, flavor: &DataFlavor) -> DndResult<TransferData>;
}

/// In-memory payload built from flavor/data pairs.
#[derive(Debug, Clone, Default)]
pub struct TransferBundle {
    entries: Vec<(DataFlavor, TransferData)>,
}

impl TransferBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the data for a flavor.
    pub fn with(mut self, flavor: DataFlavor, data: TransferData) -> Self {
        self.insert(flavor, data);
        self
    }

    /// Add (or replace) the data for a flavor.
    pub fn insert(&mut self, flavor: DataFlavor, data: TransferData) {
        if let Some(entry) = self.entries.iter_mut().find(|(f, _)| *f == flavor) {
            entry.1 = data;
        } else {
            self.entries.push((flavor, data));
        }
    }

    /// Bundle holding a single plain text entry.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().with(DataFlavor::plain_text(), TransferData::Text(text.into()))
    }
}

impl Transferable for TransferBundle {
    fn flavors(&self) -> Vec<DataFlavor> {
        self.entries.iter().map(|(flavor, _)| flavor.clone()).collect()
    }

    fn supports(&self, flavor: &DataFlavor) -> bool {
        self.entries.iter().any(|(f, _)| f == flavor)
    }

    fn fetch(&self, flavor: &DataFlavor) -> DndResult<TransferData> {
        self.entries
            .iter()
            .find(|(f, _)| f == flavor)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| DndError::UnsupportedFlavor(flavor.to_string()))
    }
}
