//! Sensor drivers, bundles and the registry/factory that builds them.

pub mod bundle;
pub mod driver;
pub mod ds18b20;
pub mod error;
pub mod factory;

pub use bundle::{Calibration, SensorBundle, ValueRange};
pub use driver::{
    Coercion, DriverDescriptor, DriverError, DriverParams, DriverType, Reading, RequiredFields,
    SensorDriver, TelemetryValue,
};
pub use ds18b20::{Ds18b20Error, Ds18b20Sensor};
pub use error::{FactoryError, FactoryResult};
pub use factory::{DriverRegistration, SensorFactory};
