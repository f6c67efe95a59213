//! Request shaping
//!
//! Adds shared-drive scope parameters and the aggregated resource-key header
//! to an outgoing [`DriveCall`]. Shaping is infallible: missing data simply
//! means nothing is added.

use std::sync::Arc;
use tracing::trace;

use crate::call::DriveCall;
use crate::context::RequestContext;
use crate::resource_keys::{ResourceKeyStore, RESOURCE_KEYS_HEADER};

/// Lets a call see items in shared drives at all.
pub const SUPPORTS_ALL_DRIVES: &str = "supportsAllDrives";
pub const INCLUDE_ITEMS_FROM_ALL_DRIVES: &str = "includeItemsFromAllDrives";
/// Narrows a call to one shared drive.
pub const CORPORA: &str = "corpora";
pub const DRIVE_ID: &str = "driveId";
/// Corpus spanning My Drive, shared drives and items shared with the caller.
pub const ALL_DRIVES_CORPUS: &str = "allDrives";

#[derive(Debug, Clone)]
pub struct RequestShaper {
    resource_keys: Arc<ResourceKeyStore>,
}

impl RequestShaper {
    pub fn new(resource_keys: Arc<ResourceKeyStore>) -> Self {
        Self { resource_keys }
    }

    pub fn resource_keys(&self) -> &Arc<ResourceKeyStore> {
        &self.resource_keys
    }

    pub fn shape(&self, mut call: DriveCall, ctx: &RequestContext) -> DriveCall {
        if let Some(drive_id) = ctx.drive_id() {
            call.set_param(SUPPORTS_ALL_DRIVES, "true");
            call.set_param(INCLUDE_ITEMS_FROM_ALL_DRIVES, "true");
            call.set_param(CORPORA, "drive");
            call.set_param(DRIVE_ID, drive_id);
        }

        if let Some(header) = self.resource_keys.build_header(ctx.involved_ids()) {
            trace!(trace_id = %ctx.trace_id(), "Attaching resource keys");
            call.set_header(RESOURCE_KEYS_HEADER, header);
        }

        call
    }

    /// [`shape`](Self::shape), then widen a listing to every corpus the
    /// caller can see. Only meaningful without a drive scope on `ctx`.
    pub fn shape_all_drives(&self, call: DriveCall, ctx: &RequestContext) -> DriveCall {
        let mut call = self.shape(call, ctx);
        call.set_param(SUPPORTS_ALL_DRIVES, "true");
        call.set_param(INCLUDE_ITEMS_FROM_ALL_DRIVES, "true");
        call.set_param(CORPORA, ALL_DRIVES_CORPUS);
        call
    }
}
