pub mod capture;
pub mod projection;
pub mod synthetic;
