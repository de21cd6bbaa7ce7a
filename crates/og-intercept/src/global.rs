// global.rs — Process-wide registry of the installed interceptor.
//
// At most one interceptor may be installed at a time. The registry records
// which instance owns the slot; installing a second instance fails until the
// first is uninstalled.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::InterceptError;
use crate::guard::{Guard, Slot};
use crate::transport::Intercepted;

struct Registration {
    owner: u64,
    slot: Slot,
}

static ACTIVE: Mutex<Option<Registration>> = Mutex::new(None);

fn registry() -> MutexGuard<'static, Option<Registration>> {
    ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Wrap a transport so it enforces whichever interceptor is installed when
/// each request is sent. Pass-through while none is.
pub fn wrap<T>(transport: T) -> Intercepted<T> {
    Intercepted::global(transport)
}

/// Whether any interceptor is installed in this process.
pub fn is_installed() -> bool {
    registry().is_some()
}

/// The guard of the installed interceptor, if any.
pub(crate) fn active_guard() -> Option<Arc<Guard>> {
    let registry = registry();
    let registration = registry.as_ref()?;
    let guard = registration
        .slot
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    guard
}

/// Claim the registry for `owner` and fill its slot with a freshly built guard.
///
/// Returns `Ok(false)` if `owner` already holds the registry; `build` is not
/// called in that case. The registry lock is held across `build`, so two
/// racing installs cannot both succeed.
pub(crate) fn claim<F>(owner: u64, slot: &Slot, build: F) -> Result<bool, InterceptError>
where
    F: FnOnce() -> Result<Guard, InterceptError>,
{
    let mut registry = registry();
    match registry.as_ref() {
        Some(reg) if reg.owner == owner => return Ok(false),
        Some(_) => return Err(InterceptError::AlreadyInstalled),
        None => {}
    }

    let guard = Arc::new(build()?);
    *slot.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(guard);
    *registry = Some(Registration {
        owner,
        slot: Arc::clone(slot),
    });
    Ok(true)
}

/// Release the registry if `owner` holds it, returning the guard it ran with.
pub(crate) fn release(owner: u64) -> Option<Arc<Guard>> {
    let mut registry = registry();
    if registry.as_ref().map(|reg| reg.owner) != Some(owner) {
        return None;
    }
    let registration = registry.take()?;
    let guard = registration
        .slot
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    guard
}
