use std::sync::{Arc, Mutex};

pub mod app;
pub mod callback;
pub mod config;
pub mod logging;
pub mod poller;
pub mod render;
pub mod status;

pub type Shared<T> = Arc<T>;
pub type Locked<T> = Mutex<T>;
