//! API operations concerning segments.

use crate::api::{ApiRequest, reports::CatalogEntries};

/// List the segments visible to the authenticated user.
#[derive(Debug, Clone, Copy)]
pub struct GetSegments;

impl ApiRequest for GetSegments {
    type Response = CatalogEntries;

    fn method(&self) -> &'static str {
        "Segments.Get"
    }
}
