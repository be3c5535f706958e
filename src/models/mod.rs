pub mod sensor;

pub use sensor::{EntryKey, RawEntry, RawValue, SensorRecord};
