// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small wgpu helpers.

use std::future::Future;

use wgpu::Device;

struct NullWake;

impl std::task::Wake for NullWake {
    fn wake(self: std::sync::Arc<Self>) {}
}

/// Block on a future, polling the device as needed.
///
/// This will deadlock if the future is awaiting anything other than GPU
/// progress.
pub fn block_on_wgpu<F: Future>(device: &Device, fut: F) -> F::Output {
    if cfg!(target_arch = "wasm32") {
        panic!("Blocking can't work on WASM, so don't try");
    }
    let waker = std::task::Waker::from(std::sync::Arc::new(NullWake));
    let mut context = std::task::Context::from_waker(&waker);
    // Same logic as `pin_mut!` macro from `pin_utils`.
    let mut fut = std::pin::pin!(fut);
    loop {
        match fut.as_mut().poll(&mut context) {
            std::task::Poll::Pending => {
                let _ = device.poll(wgpu::PollType::Wait);
            }
            std::task::Poll::Ready(item) => break item,
        }
    }
}
