use anyhow::Result;
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Tensor};
use tracing::span;

/// Pick the device for tensor operations, preferring an available GPU unless
/// the caller forces CPU.
pub fn device(cpu: bool) -> Result<Device> {
    if cpu {
        Ok(Device::Cpu)
    } else if cuda_is_available() {
        Ok(Device::new_cuda(0)?)
    } else if metal_is_available() {
        Ok(Device::new_metal(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

// Wrapper on cross entropy to add tracing
pub fn cross_entropy(inp: &Tensor, target: &Tensor) -> candle_core::Result<Tensor> {
    let span = span!(tracing::Level::TRACE, "cross-entropy");
    let _enter = span.enter();
    candle_nn::loss::cross_entropy(inp, target)
}
