//! GPU-facing sinks for staged instance data.

mod upload;

pub use upload::{InstanceUploader, RecordingUploader, UploadRecord, WgpuInstanceUploader};
