use candle_core::Device;
use chunklab_core::config::DeviceKind;
use chunklab_core::EmbedError;
use tracing::info;

pub fn select_device(kind: DeviceKind) -> Result<Device, EmbedError> {
    match kind {
        DeviceKind::Metal => {
            let dev = Device::new_metal(0).map_err(|e| {
                EmbedError::acceleration("Metal device 0 could not be initialized").with_detail(e.to_string())
            })?;
            info!("embedding device: Metal (MPS)");
            Ok(dev)
        }
        DeviceKind::Cpu => {
            info!("embedding device: CPU");
            Ok(Device::Cpu)
        }
    }
}
