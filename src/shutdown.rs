use crate::all::*;

use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Cooperative cancellation shared by the loops of a process. Requesting
// shutdown also closes the watched sockets so that blocked reads return.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
  inner: Arc<ShutdownInner>,
}

#[derive(Default)]
struct ShutdownInner {
  requested: AtomicBool,
  streams: Mutex<Vec<TcpStream>>,
}

impl ShutdownHandle {
  pub fn new() -> ShutdownHandle {
    ShutdownHandle::default()
  }

  // Route Ctrl-C to `request()`. Can only be installed once per process.
  pub fn install_interrupt_handler(&self) -> Result<()> {
    let handle = self.clone();
    ctrlc::set_handler(move || {
      info!("Interrupted, shutting down.");
      handle.request();
    }).context("Failed to install the Ctrl-C handler.")
  }

  pub fn watch(&self, stream: &TcpStream) -> Result<()> {
    let stream = stream.try_clone().context("Failed to clone socket handle.")?;
    let mut streams = self.inner.streams.lock().unwrap();
    if self.is_requested() {
      let _ = stream.shutdown(Shutdown::Both);
      return Ok(());
    }
    streams.push(stream);
    Ok(())
  }

  pub fn request(&self) {
    self.inner.requested.store(true, Ordering::SeqCst);
    for stream in self.inner.streams.lock().unwrap().drain(..) {
      // Fails harmlessly if the peer already closed the socket.
      let _ = stream.shutdown(Shutdown::Both);
    }
  }

  pub fn is_requested(&self) -> bool {
    self.inner.requested.load(Ordering::SeqCst)
  }
}
