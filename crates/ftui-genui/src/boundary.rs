//! Per-node failure boundary.
//!
//! A renderer may fail by returning [`RenderError`] or by panicking while it
//! pokes at a malformed payload. Both are caught here, logged with the
//! offending type and id, and turned into an error the dispatcher swaps for
//! a compact placeholder. The boundary covers exactly one node: siblings and
//! ancestors never see the failure.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::RenderError;
use crate::record::ComponentRecord;
use crate::view::{PlaceholderKind, View};

/// Run one renderer call, converting panics into [`RenderError::Panicked`].
pub fn isolate<F>(record: &ComponentRecord, render: F) -> Result<View, RenderError>
where
    F: FnOnce() -> Result<View, RenderError>,
{
    let result = match catch_unwind(AssertUnwindSafe(render)) {
        Ok(result) => result,
        Err(payload) => Err(RenderError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    };

    if let Err(error) = &result {
        tracing::warn!(
            component_type = %record.type_tag,
            component_id = %record.id,
            error = %error,
            "component render failed"
        );
    }
    result
}

/// Placeholder view for a failed node. Children that did render are kept in
/// slots below the marker.
#[must_use]
pub fn failure_view(record: &ComponentRecord, error: &RenderError, child_count: usize) -> View {
    let mut items = vec![View::Placeholder(PlaceholderKind::RenderFailed {
        type_tag: record.type_tag.clone(),
        message: error.to_string(),
    })];
    items.extend(View::slots(child_count));
    View::stack(items)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
