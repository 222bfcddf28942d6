//! Instance buffer upload sinks.
//!
//! The flush phase hands each dirty proxy buffer's byte range to an
//! [`InstanceUploader`] exactly once per frame.

use std::sync::Arc;

use tracing::trace;

use crate::instancing::{ProxyInstance, ProxyKind};

/// Receives dirty instance bytes at flush time.
pub trait InstanceUploader {
    /// Writes `bytes` at byte `offset` of `kind`'s GPU buffer.
    fn upload(&mut self, kind: ProxyKind, offset: u64, bytes: &[u8]);
}

/// Uploads through `wgpu::Queue::write_buffer`.
///
/// Size it from the same [`RenderConfig`](crate::RenderConfig) the
/// orchestrator uses, then bind [`Self::buffer`] as the per-instance vertex
/// stream of each proxy draw.
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use verdant_rendering::{
///     Camera, ProxyInstance, ProxyKind, RenderConfig, RenderResult, UpdateOrchestrator,
///     WgpuInstanceUploader,
/// };
/// use verdant_shared::Snapshot;
///
/// fn upload_frame(
///     device: &wgpu::Device,
///     queue: Arc<wgpu::Queue>,
///     camera: &Camera,
///     snapshot: Snapshot,
/// ) -> RenderResult<u32> {
///     let config = RenderConfig::default();
///     let proxy = &config.proxy;
///     let capacities = [proxy.creature_capacity, proxy.plant_capacity, proxy.corpse_capacity];
///     let mut uploader = WgpuInstanceUploader::new(device, queue, capacities);
///     let mut orchestrator = UpdateOrchestrator::new(config)?;
///
///     let report = orchestrator.apply_snapshot(snapshot, camera, &mut uploader);
///
///     // Instance stream for the creature proxy mesh, second vertex slot.
///     let _layout = ProxyInstance::desc();
///     let _instances = uploader.buffer(ProxyKind::Creatures).slice(..);
///     Ok(report.buffers_flushed)
/// }
/// ```
pub struct WgpuInstanceUploader {
    queue: Arc<wgpu::Queue>,
    /// One vertex buffer per [`ProxyKind`], in [`ProxyKind::ALL`] order.
    buffers: [wgpu::Buffer; 3],
}

impl WgpuInstanceUploader {
    /// Allocates one GPU buffer per proxy kind, sized for `capacities`
    /// instances (in [`ProxyKind::ALL`] order).
    #[must_use]
    pub fn new(device: &wgpu::Device, queue: Arc<wgpu::Queue>, capacities: [u32; 3]) -> Self {
        let buffers = ProxyKind::ALL.map(|kind| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(kind.label()),
                size: u64::from(capacities[kind.index()]) * ProxyInstance::SIZE as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        Self { queue, buffers }
    }

    /// GPU buffer for `kind`, for binding as an instance vertex buffer.
    #[must_use]
    pub fn buffer(&self, kind: ProxyKind) -> &wgpu::Buffer {
        &self.buffers[kind.index()]
    }
}

impl InstanceUploader for WgpuInstanceUploader {
    fn upload(&mut self, kind: ProxyKind, offset: u64, bytes: &[u8]) {
        trace!(buffer = kind.label(), offset, len = bytes.len(), "Instance upload");
        self.queue.write_buffer(&self.buffers[kind.index()], offset, bytes);
    }
}

/// One recorded upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRecord {
    /// Target buffer.
    pub kind: ProxyKind,
    /// Byte offset.
    pub offset: u64,
    /// Byte length.
    pub len: usize,
}

/// Uploader that only records what it was given. Used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingUploader {
    records: Vec<UploadRecord>,
    bytes: u64,
}

impl RecordingUploader {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads seen so far.
    #[must_use]
    pub fn records(&self) -> &[UploadRecord] {
        &self.records
    }

    /// Total bytes seen.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.bytes
    }

    /// Uploads to `kind` seen so far.
    #[must_use]
    pub fn count_for(&self, kind: ProxyKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }

    /// Forgets recorded uploads.
    pub fn clear(&mut self) {
        self.records.clear();
        self.bytes = 0;
    }
}

impl InstanceUploader for RecordingUploader {
    fn upload(&mut self, kind: ProxyKind, offset: u64, bytes: &[u8]) {
        self.bytes += bytes.len() as u64;
        self.records.push(UploadRecord { kind, offset, len: bytes.len() });
    }
}
