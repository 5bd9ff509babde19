//! Error module docs.

use crate::vk;

/// Error returned by raw device calls.
///
/// `DeviceLost` is not recoverable. Objects created from the device should be freed
/// and the device recreated before continuing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Fail)]
pub enum DeviceError {
    /// Host allocation failed.
    #[fail(display = "Out of host memory")]
    OutOfHostMemory,

    /// Device allocation failed.
    #[fail(display = "Out of device memory")]
    OutOfDeviceMemory,

    /// Device lost. Re-initialization required.
    #[fail(display = "Device lost. Re-initialization required")]
    DeviceLost,

    /// Fence wait ran out of time.
    #[fail(display = "Timed out waiting for a fence")]
    Timeout,

    /// Any other failure code.
    #[fail(display = "Device call failed with {:?}", _0)]
    Other(vk::Result),
}

impl From<vk::Result> for DeviceError {
    fn from(result: vk::Result) -> Self {
        match result {
            vk::Result::ERROR_OUT_OF_HOST_MEMORY => DeviceError::OutOfHostMemory,
            vk::Result::ERROR_OUT_OF_DEVICE_MEMORY => DeviceError::OutOfDeviceMemory,
            vk::Result::ERROR_DEVICE_LOST => DeviceError::DeviceLost,
            vk::Result::TIMEOUT => DeviceError::Timeout,
            other => DeviceError::Other(other),
        }
    }
}
