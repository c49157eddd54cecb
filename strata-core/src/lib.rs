pub mod buffer;
pub mod context;
pub mod hardware;
pub mod queue;

pub use buffer::{DeviceBuffer, DeviceView};
pub use context::DeviceContext;
pub use hardware::{HardwareInfo, TargetArch};
pub use queue::{CommandQueue, DeviceError};
