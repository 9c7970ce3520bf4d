pub mod display;
pub mod position;
pub mod session;
