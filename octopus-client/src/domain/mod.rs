pub mod consumption_reading;
pub mod meter_point;

pub use consumption_reading::ConsumptionReading;
pub use meter_point::{MeterPoint, PointType};
