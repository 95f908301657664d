pub mod events;
pub mod faults;
pub mod health;
pub mod publish;
pub mod sensors;
pub mod triggers;
