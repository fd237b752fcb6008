//! Execution device selection and ONNX session construction.
//!
//! Maps the configured [`Device`] to ONNX Runtime execution providers and
//! builds sessions with them. Auto mode probes CUDA, then CoreML, then falls
//! back to CPU.

use std::path::Path;

use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::Session;

use crate::config::Device;
use crate::error::{PipelineError, Result};

/// Returns the execution providers for the given device selection.
pub fn providers_for(device: Device) -> Vec<ExecutionProviderDispatch> {
    match device {
        Device::Auto => {
            if provider_works(&CUDAExecutionProvider::default()) {
                vec![CUDAExecutionProvider::default().build()]
            } else if provider_works(&CoreMLExecutionProvider::default()) {
                vec![CoreMLExecutionProvider::default().build()]
            } else {
                vec![CPUExecutionProvider::default().build()]
            }
        }
        Device::Cpu => vec![CPUExecutionProvider::default().build()],
        Device::Cuda => vec![CUDAExecutionProvider::default().build()],
        Device::Metal => vec![CoreMLExecutionProvider::default().build()],
    }
}

/// Returns a human-readable label for the device that will actually run.
pub fn device_label(device: Device) -> &'static str {
    match device {
        Device::Auto => {
            if provider_works(&CUDAExecutionProvider::default()) {
                "CUDA"
            } else if provider_works(&CoreMLExecutionProvider::default()) {
                "CoreML"
            } else {
                "CPU"
            }
        }
        Device::Cpu => "CPU",
        Device::Cuda => "CUDA",
        Device::Metal => "CoreML",
    }
}

/// Probes whether an execution provider registers on this system.
fn provider_works(provider: &impl ExecutionProvider) -> bool {
    match Session::builder() {
        Ok(mut builder) => provider.register(&mut builder).is_ok(),
        Err(_) => false,
    }
}

/// Builds an ONNX session for a graph file with the configured device and
/// thread count.
pub fn session_from_file(
    path: &Path,
    device: Device,
    threads: Option<u32>,
) -> Result<Session> {
    let mut builder = Session::builder()
        .map_err(|e| PipelineError::model_load_failed(format!("failed to create session: {}", e)))?
        .with_execution_providers(providers_for(device))
        .map_err(|e| {
            PipelineError::model_load_failed(format!("failed to register providers: {}", e))
        })?;

    if let Some(threads) = threads {
        builder = builder.with_intra_threads(threads as usize).map_err(|e| {
            PipelineError::model_load_failed(format!("failed to set thread count: {}", e))
        })?;
    }

    builder.commit_from_file(path).map_err(|e| {
        PipelineError::model_load_failed(format!("failed to load {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_devices_resolve_to_one_provider() {
        assert_eq!(providers_for(Device::Cpu).len(), 1);
        assert_eq!(providers_for(Device::Cuda).len(), 1);
        assert_eq!(providers_for(Device::Metal).len(), 1);
    }

    #[test]
    fn auto_resolves_to_one_provider() {
        assert_eq!(providers_for(Device::Auto).len(), 1);
    }

    #[test]
    fn device_labels() {
        assert_eq!(device_label(Device::Cpu), "CPU");
        assert_eq!(device_label(Device::Cuda), "CUDA");
        assert_eq!(device_label(Device::Metal), "CoreML");
        let auto = device_label(Device::Auto);
        assert!(auto == "CPU" || auto == "CUDA" || auto == "CoreML");
    }
}
