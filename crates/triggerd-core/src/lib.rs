pub mod capture;
pub mod config;
pub mod context;
pub mod control;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod io;
pub mod paths;
pub mod registry;
pub mod seed;
pub mod state;
pub mod store;
pub mod strategy;
pub mod topics;
pub mod trigger;
pub mod value;

pub use error::{ActionError, ConditionError, LoadError, Result, TriggerdError};
