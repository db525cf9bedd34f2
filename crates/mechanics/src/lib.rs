pub mod vehicle;

pub use vehicle::{SpeedPlatform, VehiclePlant, VehiclePlantConfig, WriteKind, WriteRecord};
