//! Exception region construction.

use crate::{
    compiler::AddressMap,
    metadata::{
        method::{ExceptionHandlerFlags, ExceptionRegion, HandlerKind, Method, RawExceptionHandler},
        typesystem::Registry,
    },
    Error, ReferenceKind, Result,
};

/// Convert every handler clause of the method's body into an index-bounded region
pub(crate) fn build_regions(
    method: &Method,
    registry: &dyn Registry,
    handlers: &[RawExceptionHandler],
    map: &AddressMap,
) -> Result<Vec<ExceptionRegion>> {
    handlers
        .iter()
        .map(|handler| build_region(method, registry, handler, map))
        .collect()
}

fn build_region(
    method: &Method,
    registry: &dyn Registry,
    handler: &RawExceptionHandler,
    map: &AddressMap,
) -> Result<ExceptionRegion> {
    let kind = if handler.flags == ExceptionHandlerFlags::EXCEPTION {
        let raw = handler
            .catch_type
            .as_ref()
            .ok_or_else(|| Error::UnresolvedReference {
                kind: ReferenceKind::Type,
                reference: format!("catch clause at IL_{:04x} of {}", handler.handler_offset, method),
            })?;
        HandlerKind::Catch(method.generic_context().resolve_type(registry, raw)?)
    } else if handler.flags == ExceptionHandlerFlags::FINALLY {
        HandlerKind::Finally
    } else {
        return Err(Error::UnsupportedHandlerKind(handler.flags));
    };

    let (try_start, try_end) = inclusive_range(method, map, handler.try_offset, handler.try_end())?;
    let (handler_start, handler_end) =
        inclusive_range(method, map, handler.handler_offset, handler.handler_end())?;

    Ok(ExceptionRegion {
        try_start,
        try_end,
        handler_start,
        handler_end,
        kind,
    })
}

/// Map a `[start, end)` offset range onto inclusive instruction indices
fn inclusive_range(method: &Method, map: &AddressMap, start: u32, end: u32) -> Result<(u32, u32)> {
    let first = map.branch_target(start, method)?;
    let past_end = map
        .end_index(end)
        .ok_or_else(|| Error::MalformedBranchTarget {
            method: method.to_string(),
            offset: end,
        })?;

    if past_end <= first {
        return Err(malformed_error!(
            "Empty exception range IL_{:04x}..IL_{:04x} in {}",
            start,
            end,
            method
        ));
    }

    Ok((first, past_end - 1))
}
