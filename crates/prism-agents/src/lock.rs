// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The device-wide lock.
//!
//! Uploads, settings changes and scene renders all mutate the device and the
//! resource cache. A [`SharedRenderer`] serializes them: a streaming thread
//! uploads through its own handle while the main thread renders through
//! another, each holding a [`RenderLock`] for the duration of the call.

use crate::render_agent::RenderAgent;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

/// A cloneable, thread-safe handle to one [`RenderAgent`].
#[derive(Debug, Clone)]
pub struct SharedRenderer {
    inner: Arc<Mutex<RenderAgent>>,
}

/// Exclusive access to the renderer. Dropping the guard unlocks it.
#[derive(Debug)]
pub struct RenderLock<'a> {
    guard: MutexGuard<'a, RenderAgent>,
}

impl SharedRenderer {
    /// Wraps `agent` for sharing between threads.
    pub fn new(agent: RenderAgent) -> Self {
        Self {
            inner: Arc::new(Mutex::new(agent)),
        }
    }

    /// Blocks until the renderer is free and returns a guard over it.
    ///
    /// A panic on another thread while it held the lock does not poison the
    /// renderer for everyone else; the agent is handed out as it was left.
    pub fn lock(&self) -> RenderLock<'_> {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| {
            log::warn!("SharedRenderer: Recovering the renderer from a poisoned lock");
            poisoned.into_inner()
        });
        RenderLock { guard }
    }

    /// Returns the guard if the renderer is free right now.
    pub fn try_lock(&self) -> Option<RenderLock<'_>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(RenderLock { guard }),
            Err(std::sync::TryLockError::Poisoned(poisoned)) => {
                log::warn!("SharedRenderer: Recovering the renderer from a poisoned lock");
                Some(RenderLock {
                    guard: poisoned.into_inner(),
                })
            }
            Err(std::sync::TryLockError::WouldBlock) => None,
        }
    }

    /// Unwraps the agent once every other handle is gone.
    ///
    /// Returns `self` unchanged while another handle is alive.
    pub fn into_inner(self) -> Result<RenderAgent, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }
}

impl RenderLock<'_> {
    /// Releases the lock. Same as dropping the guard.
    pub fn unlock(self) {}
}

impl Deref for RenderLock<'_> {
    type Target = RenderAgent;

    fn deref(&self) -> &RenderAgent {
        &self.guard
    }
}

impl DerefMut for RenderLock<'_> {
    fn deref_mut(&mut self) -> &mut RenderAgent {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use prism_core::renderer::api::DeviceCaps;
    use prism_infra::HeadlessDevice;
    use std::thread;

    fn shared() -> SharedRenderer {
        let device = HeadlessDevice::new(DeviceCaps::high_end());
        let agent = RenderAgent::new(Arc::new(device), &RendererConfig::default()).unwrap();
        SharedRenderer::new(agent)
    }

    #[test]
    fn test_unlock_frees_the_renderer() {
        let renderer = shared();
        let guard = renderer.lock();
        assert!(renderer.try_lock().is_none());
        guard.unlock();
        assert!(renderer.try_lock().is_some());
        renderer.into_inner().unwrap().shutdown();
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let renderer = shared();
        let other = renderer.clone();
        let result = thread::spawn(move || {
            let _guard = other.lock();
            panic!("streaming thread failed");
        })
        .join();
        assert!(result.is_err());

        let mut guard = renderer.lock();
        assert!(guard.is_initialized());
        guard.shutdown();
    }

    #[test]
    fn test_into_inner_waits_for_every_handle() {
        let renderer = shared();
        let other = renderer.clone();
        let renderer = renderer.into_inner().unwrap_err();
        drop(other);
        let mut agent = renderer.into_inner().unwrap();
        agent.shutdown();
    }
}
