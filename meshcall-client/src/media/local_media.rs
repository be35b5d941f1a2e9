use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

/// Local capture as seen by the mesh: started before the first join,
/// stopped on hangup. Tracks themselves are handed to the session factory.
#[async_trait]
pub trait LocalMedia: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self);
}

/// Media prepared up front by the host. Starting always succeeds.
#[derive(Debug, Default)]
pub struct PreparedMedia {
    active: AtomicBool,
}

impl PreparedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalMedia for PreparedMedia {
    async fn start(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// No capture device. The mesh falls back to receive-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocalMedia;

#[async_trait]
impl LocalMedia for NoLocalMedia {
    async fn start(&self) -> Result<()> {
        bail!("no capture device available")
    }

    async fn stop(&self) {}
}
