mod device;
mod queue;


pub use device::{CollectorState, DeviceCollector};
pub use queue::{EventQueue, StreamEvent};
