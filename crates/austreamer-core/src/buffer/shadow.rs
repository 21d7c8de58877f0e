//! Zero-copy fan-out of one upstream payload to N consumers.
//!
//! A [`ShadowGroup`] keeps a release ledger keyed by shadow index. Each
//! [`ShadowBuffer`] marks its own entry on release; the upstream hold (and
//! the optional release hook) is dropped exactly once, when the last entry
//! flips. Releasing the same shadow twice does not count twice.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Buffer, BufferKind, Payload};

type ReleaseHook = Box<dyn FnOnce() + Send>;

struct Ledger {
    released: Vec<bool>,
    outstanding: usize,
    upstream: Option<Payload>,
    on_release: Option<ReleaseHook>,
}

impl Ledger {
    /// Marks `index` released; hands back the hook once the last one goes.
    fn release(&mut self, index: usize) -> Option<ReleaseHook> {
        let flag = self.released.get_mut(index)?;
        if *flag {
            return None;
        }
        *flag = true;
        self.outstanding -= 1;
        if self.outstanding > 0 {
            return None;
        }
        self.upstream = None;
        self.on_release.take()
    }
}

/// Release ledger shared by the shadows of one upstream payload.
#[derive(Clone)]
pub struct ShadowGroup {
    ledger: Arc<Mutex<Ledger>>,
}

impl ShadowGroup {
    /// Splits `upstream` into `count` shadows.
    pub fn fan_out(upstream: Payload, count: usize) -> Vec<ShadowBuffer> {
        Self::fan_out_with(upstream, count, None)
    }

    /// Like [`fan_out`](Self::fan_out), running `on_release` when the last
    /// shadow is released.
    pub fn fan_out_with(
        upstream: Payload,
        count: usize,
        on_release: Option<ReleaseHook>,
    ) -> Vec<ShadowBuffer> {
        let group = Self {
            ledger: Arc::new(Mutex::new(Ledger {
                released: vec![false; count],
                outstanding: count,
                upstream: Some(upstream.clone()),
                on_release,
            })),
        };
        (0..count)
            .map(|index| ShadowBuffer {
                index,
                view: Some(upstream.clone()),
                group: group.clone(),
            })
            .collect()
    }

    /// Shadows not yet released.
    pub fn outstanding(&self) -> usize {
        self.ledger.lock().outstanding
    }

    /// Whether the upstream payload is still held by the group.
    pub fn holds_upstream(&self) -> bool {
        self.ledger.lock().upstream.is_some()
    }
}

/// Read-only alias of an upstream payload.
///
/// `require` always fails: a shadow never owns storage.
pub struct ShadowBuffer {
    index: usize,
    view: Option<Payload>,
    group: ShadowGroup,
}

impl ShadowBuffer {
    /// Position of this shadow inside its group.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Ledger shared with sibling shadows.
    pub fn group(&self) -> &ShadowGroup {
        &self.group
    }
}

impl Buffer for ShadowBuffer {
    fn kind(&self) -> BufferKind {
        BufferKind::Shadow
    }

    fn require(&mut self, _size: usize) -> Option<&mut [u8]> {
        None
    }

    fn payload(&self) -> Option<&[u8]> {
        self.view.as_ref().map(Payload::as_slice)
    }

    fn release(&mut self) {
        self.view = None;
        let hook = self.group.ledger.lock().release(self.index);
        if let Some(hook) = hook {
            hook();
        }
    }

    fn share(&self) -> Option<Payload> {
        self.view.clone()
    }
}

impl Drop for ShadowBuffer {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn upstream_released_only_after_last_shadow() {
        let fired = Arc::new(AtomicUsize::new(0));
        let hook: Box<dyn FnOnce() + Send> = {
            let fired = Arc::clone(&fired);
            Box::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };
        let mut shadows =
            ShadowGroup::fan_out_with(Payload::copy_from(&[9; 16]), 3, Some(hook));
        let group = shadows[0].group().clone();

        assert!(shadows[1].require(4).is_none());
        assert_eq!(shadows[2].payload(), Some(&[9u8; 16][..]));

        shadows[0].release();
        shadows[0].release();
        assert_eq!(group.outstanding(), 2);
        shadows[2].release();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(group.holds_upstream());

        shadows[1].release();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!group.holds_upstream());

        drop(shadows);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn shadows_alias_upstream_bytes() {
        let upstream = Payload::copy_from(&[1, 2, 3]);
        let shadows = ShadowGroup::fan_out(upstream.clone(), 2);
        let a = shadows[0].share().unwrap();
        assert!(a.ptr_eq(&upstream));
    }
}
