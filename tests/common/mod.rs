#![allow(dead_code)]

use async_trait::async_trait;
use cive_verify::confluxscan::Sleeper;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

/// Records requested sleeps instead of waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub const CONTRACT_ADDRESS: &str = "0x8a81c1619f38a5bb29cfaf20db24b23f42a42dcb";
