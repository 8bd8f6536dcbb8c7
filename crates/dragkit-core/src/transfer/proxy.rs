//! Receiver-side view of the offered payload.

use std::sync::Arc;

use super::{DataFlavor, TransferData, Transferable};
use crate::error::DndResult;

/// Facade over a payload handed to a drop target.
///
/// For a local transfer, live objects fetched through a serialized-object
/// flavor are deep copied so the receiver never aliases the source's state.
/// Objects without a copy capability are shared as-is.
#[derive(Clone)]
pub struct TransferProxy {
    inner: Arc<dyn Transferable>,
    is_local: bool,
}

impl TransferProxy {
    /// Wrap `payload`. `is_local` is true when source and target share a process.
    pub fn wrap(payload: Arc<dyn Transferable>, is_local: bool) -> Self {
        Self { inner: payload, is_local }
    }

    pub fn is_local(&self) -> bool {
        self.is_local
    }

    /// The wrapped payload.
    pub fn inner(&self) -> &Arc<dyn Transferable> {
        &self.inner
    }
}

impl Transferable for TransferProxy {
    fn flavors(&self) -> Vec<DataFlavor> {
        self.inner.flavors()
    }

    fn supports(&self, flavor: &DataFlavor) -> bool {
        self.inner.supports(flavor)
    }

    fn fetch(&self, flavor: &DataFlavor) -> DndResult<TransferData> {
        let data = self.inner.fetch(flavor)?;
        if !self.is_local || !flavor.is_serialized_object() {
            return Ok(data);
        }

        match data {
            TransferData::Object(object) => match object.deep_copy() {
                Some(copy) => Ok(TransferData::Object(copy)),
                None => {
                    log::debug!("No private copy for {}, returning shared object", flavor);
                    Ok(TransferData::Object(object))
                }
            },
            other => Ok(other),
        }
    }
}
