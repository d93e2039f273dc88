pub mod schools;
pub mod uploads;
