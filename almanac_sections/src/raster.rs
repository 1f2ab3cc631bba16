// Copyright 2025 the Almanac Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background rasterization for the year section.
//!
//! This is the single place the component leaves the UI thread. Each year
//! section owns one [`RenderWorker`]: scenes are submitted from the
//! coordinating thread, rasterized on the worker thread through the
//! embedder's [`Rasterizer`], and the results are drained back on the
//! coordinating thread; publishing (swapping in the bitmap and hit-test
//! coordinates) never happens anywhere else. No locks are involved beyond
//! the channels; the staleness check at the publish site is the sole
//! concurrency guard, which suffices because the only shared mutable target
//! is that final publish step.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::JoinHandle;

use kurbo::Size;

use crate::year::{YearCoordinates, YearScene};

/// A rendered page: premultiplied RGBA8, row-major.
#[derive(Clone, Debug)]
pub struct Bitmap {
    /// Pixel dimensions.
    pub width: u32,
    /// Pixel dimensions.
    pub height: u32,
    /// Device scale the bitmap was rendered at.
    pub scale: f64,
    /// Pixel data, `width * height * 4` bytes.
    pub data: Arc<[u8]>,
}

/// Embedder-supplied scene rasterizer.
///
/// The component records what to draw ([`YearScene`]); turning text runs and
/// shapes into pixels is platform territory, injected here. Implementations
/// run on the worker thread and must therefore be `Send`.
pub trait Rasterizer {
    /// Rasterizes one scene.
    fn rasterize(&mut self, scene: &YearScene) -> Bitmap;
}

/// One submitted render job.
#[derive(Debug)]
pub struct RenderJob {
    /// Axis index of the page the job renders.
    pub index: i64,
    /// Geometry reference size captured at submit time; compared against the
    /// page's current reference before publishing.
    pub reference: Size,
    /// Scene to rasterize.
    pub scene: YearScene,
    /// Hit-test geometry, published together with the bitmap.
    pub coordinates: YearCoordinates,
}

/// One completed render.
#[derive(Debug)]
pub struct RenderResult {
    /// Axis index of the rendered page.
    pub index: i64,
    /// Geometry reference size the job was submitted for.
    pub reference: Size,
    /// Rasterized page.
    pub bitmap: Bitmap,
    /// Hit-test geometry to publish with the bitmap.
    pub coordinates: YearCoordinates,
}

/// Per-section background raster thread.
#[derive(Debug)]
pub struct RenderWorker {
    jobs: Sender<RenderJob>,
    results: Receiver<RenderResult>,
    handle: Option<JoinHandle<()>>,
}

impl RenderWorker {
    /// Spawns the worker around the embedder's rasterizer.
    #[must_use]
    pub fn spawn(mut rasterizer: Box<dyn Rasterizer + Send>) -> Self {
        let (jobs, job_rx) = channel::<RenderJob>();
        let (result_tx, results) = channel::<RenderResult>();
        let handle = std::thread::Builder::new()
            .name("almanac-year-raster".into())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let bitmap = rasterizer.rasterize(&job.scene);
                    let result = RenderResult {
                        index: job.index,
                        reference: job.reference,
                        bitmap,
                        coordinates: job.coordinates,
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            })
            .ok();
        Self {
            jobs,
            results,
            handle,
        }
    }

    /// Queues a render job. Jobs for stale geometry are filtered at the
    /// publish site, not here.
    pub fn submit(&self, job: RenderJob) {
        // A worker that failed to spawn drops jobs; the section simply never
        // publishes a bitmap, which renders as the coordinate-only fallback.
        let _ = self.jobs.send(job);
    }

    /// Drains completed renders. Call only from the coordinating thread.
    #[must_use]
    pub fn drain(&self) -> Vec<RenderResult> {
        let mut out = Vec::new();
        while let Ok(result) = self.results.try_recv() {
            out.push(result);
        }
        out
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        let (closed, _) = channel();
        self.jobs = closed;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rasterizer that stamps the scene size into a 1×1 bitmap.
    struct Probe;

    impl Rasterizer for Probe {
        fn rasterize(&mut self, scene: &YearScene) -> Bitmap {
            let value = scene.size.width.clamp(0.0, 255.0);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "test probe encodes a small clamped value"
            )]
            let byte = value as u8;
            Bitmap {
                width: 1,
                height: 1,
                scale: 1.0,
                data: Arc::from(vec![byte, 0, 0, 255].into_boxed_slice()),
            }
        }
    }

    #[test]
    fn worker_round_trips_jobs() {
        let worker = RenderWorker::spawn(Box::new(Probe));
        worker.submit(RenderJob {
            index: 3,
            reference: Size::new(100.0, 200.0),
            scene: YearScene {
                size: Size::new(100.0, 400.0),
                ops: Vec::new(),
            },
            coordinates: YearCoordinates::default(),
        });

        // Single consumer-producer pair; poll until the result lands.
        let mut results = Vec::new();
        for _ in 0..100 {
            results = worker.drain();
            if !results.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].index, 3);
        assert_eq!(results[0].reference, Size::new(100.0, 200.0));
        assert_eq!(results[0].bitmap.data[0], 100);
    }
}
