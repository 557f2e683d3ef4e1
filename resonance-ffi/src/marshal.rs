//! Raw pointer to slice conversion for the exported functions.
//!
//! Callers check the declared shape against the session before any pointer
//! is turned into a slice.

use std::panic::{AssertUnwindSafe, catch_unwind};

use resonance::{BufferError, Session};

/// Planar calls with at most this many channels build their slice table on the stack.
const STACK_CHANNELS: usize = 32;

/// Run `f`, turning a panic into `fallback` so no unwind crosses into C.
pub(crate) fn guard<R>(entry: &'static str, fallback: R, f: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(entry, "panic caught at the C boundary");
            fallback
        }
    }
}

/// Borrow the session behind a handle.
///
/// # Safety
/// `handle` must be null or a live handle from `resonance_create_api`.
pub(crate) unsafe fn session<'a>(handle: *mut std::ffi::c_void) -> Option<&'a Session> {
    unsafe { (handle as *const Session).as_ref() }
}

/// # Safety
/// A non-null `ptr` must be valid for `len` elements.
pub(crate) unsafe fn slice<'a, T>(ptr: *const T, len: usize) -> Option<&'a [T]> {
    if ptr.is_null() { None } else { Some(unsafe { std::slice::from_raw_parts(ptr, len) }) }
}

/// # Safety
/// A non-null `ptr` must be valid for writes of `len` elements.
pub(crate) unsafe fn slice_mut<'a, T>(ptr: *mut T, len: usize) -> Option<&'a mut [T]> {
    if ptr.is_null() { None } else { Some(unsafe { std::slice::from_raw_parts_mut(ptr, len) }) }
}

/// Present `num_channels` caller-owned output regions as slices to `f`.
///
/// # Safety
/// `ptrs` must point at `num_channels` pointers, each valid for writes of
/// `num_frames` elements.
pub(crate) unsafe fn with_planar_mut<T, R>(
    ptrs: *const *mut T,
    num_channels: usize,
    num_frames: usize,
    f: impl FnOnce(&mut [&mut [T]]) -> R,
) -> Result<R, BufferError> {
    let table = unsafe { slice(ptrs, num_channels) }.ok_or(BufferError::NullChannel(0))?;
    if let Some(channel) = table.iter().position(|p| p.is_null()) {
        return Err(BufferError::NullChannel(channel));
    }
    let region = |p: &*mut T| unsafe { std::slice::from_raw_parts_mut(*p, num_frames) };
    if num_channels <= STACK_CHANNELS {
        let mut regions: [&mut [T]; STACK_CHANNELS] = Default::default();
        for (slot, p) in regions.iter_mut().zip(table) {
            *slot = region(p);
        }
        Ok(f(&mut regions[..num_channels]))
    } else {
        let mut regions: Vec<&mut [T]> = table.iter().map(region).collect();
        Ok(f(&mut regions))
    }
}

/// Present `num_channels` caller-owned input regions as slices to `f`.
///
/// # Safety
/// `ptrs` must point at `num_channels` pointers, each valid for reads of
/// `num_frames` elements.
pub(crate) unsafe fn with_planar<T, R>(
    ptrs: *const *const T,
    num_channels: usize,
    num_frames: usize,
    f: impl FnOnce(&[&[T]]) -> R,
) -> Result<R, BufferError> {
    let table = unsafe { slice(ptrs, num_channels) }.ok_or(BufferError::NullChannel(0))?;
    if let Some(channel) = table.iter().position(|p| p.is_null()) {
        return Err(BufferError::NullChannel(channel));
    }
    let region = |p: &*const T| unsafe { std::slice::from_raw_parts(*p, num_frames) };
    if num_channels <= STACK_CHANNELS {
        let mut regions: [&[T]; STACK_CHANNELS] = Default::default();
        for (slot, p) in regions.iter_mut().zip(table) {
            *slot = region(p);
        }
        Ok(f(&regions[..num_channels]))
    } else {
        let regions: Vec<&[T]> = table.iter().map(region).collect();
        Ok(f(&regions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_swallows_panics() {
        assert_eq!(guard("test", -1, || panic!("boom")), -1);
        assert_eq!(guard("test", -1, || 7), 7);
    }

    #[test]
    fn planar_tables_reject_nulls() {
        let mut a = [0.0f32; 4];
        let ptrs = [a.as_mut_ptr(), std::ptr::null_mut()];
        let result = unsafe { with_planar_mut(ptrs.as_ptr(), 2, 4, |_| ()) };
        assert_eq!(result, Err(BufferError::NullChannel(1)));
        let result = unsafe { with_planar_mut::<f32, ()>(std::ptr::null(), 2, 4, |_| ()) };
        assert_eq!(result, Err(BufferError::NullChannel(0)));
    }

    #[test]
    fn wide_tables_spill_to_the_heap() {
        let mut data = vec![vec![0i16; 2]; STACK_CHANNELS + 1];
        let ptrs: Vec<*mut i16> = data.iter_mut().map(|c| c.as_mut_ptr()).collect();
        let seen = unsafe { with_planar_mut(ptrs.as_ptr(), ptrs.len(), 2, |regions| regions.len()) };
        assert_eq!(seen, Ok(STACK_CHANNELS + 1));
    }
}
