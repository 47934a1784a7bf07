pub mod calibration;
pub mod run;
