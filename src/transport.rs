// Best-effort fan-out of encoded frames over TCP. Every subscriber gets a
// small bounded queue drained by its own writer thread; a full queue drops the
// newest message for that subscriber only, so a slow consumer sees gaps
// instead of growing memory or stalling the producer.

use crate::all::*;

use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "tcp://*:5555";
pub const DEFAULT_CONNECT: &str = "tcp://127.0.0.1:5555";

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

// `tcp://host:port` or `host:port` to a socket address string. `*` as the
// host means all interfaces.
pub fn parse_endpoint(endpoint: &str) -> Result<String> {
  let address = match endpoint.split_once("://") {
    Some(("tcp", rest)) => rest,
    Some((scheme, _)) => bail!("Unsupported transport {} in endpoint {}.", scheme, endpoint),
    None => endpoint,
  };
  let (host, port) = address.rsplit_once(':')
    .ok_or(anyhow!("Endpoint {} has no port.", endpoint))?;
  let port: u16 = port.parse()
    .context(format!("Invalid port in endpoint {}.", endpoint))?;
  let host = if host == "*" { "0.0.0.0" } else { host };
  if host.is_empty() {
    bail!("Endpoint {} has no host.", endpoint);
  }
  Ok(format!("{}:{}", host, port))
}

struct Subscriber {
  peer: SocketAddr,
  tx: SyncSender<Arc<str>>,
  stream: TcpStream,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishStats {
  pub published: u64,
  pub delivered: u64,
  pub dropped: u64,
}

pub struct Publisher {
  local_addr: SocketAddr,
  subscribers: Arc<Mutex<Vec<Subscriber>>>,
  running: Arc<AtomicBool>,
  accept_thread: Option<JoinHandle<()>>,
  stats: PublishStats,
}

impl Publisher {
  pub fn bind(endpoint: &str, queue_capacity: usize) -> Result<Publisher> {
    if queue_capacity == 0 {
      bail!("Subscriber queue capacity must be at least 1.");
    }
    let address = parse_endpoint(endpoint)?;
    let listener = TcpListener::bind(&address)
      .context(format!("Failed to bind {}.", endpoint))?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;

    let subscribers = Arc::new(Mutex::new(vec![]));
    let running = Arc::new(AtomicBool::new(true));
    let accept_thread = {
      let subscribers = subscribers.clone();
      let running = running.clone();
      std::thread::Builder::new()
        .name("accept".to_string())
        .spawn(move || accept_loop(listener, subscribers, running, queue_capacity))?
    };
    info!("Publishing frames on {} ({}).", endpoint, local_addr);
    Ok(Publisher {
      local_addr,
      subscribers,
      running,
      accept_thread: Some(accept_thread),
      stats: PublishStats::default(),
    })
  }

  pub fn local_addr(&self) -> SocketAddr {
    self.local_addr
  }

  pub fn subscriber_count(&self) -> usize {
    self.subscribers.lock().unwrap().len()
  }

  pub fn stats(&self) -> PublishStats {
    self.stats
  }

  // Returns the number of subscribers the frame was queued for.
  pub fn publish(&mut self, frame: &Frame) -> Result<usize> {
    let mut line = wire::encode(frame)?;
    line.push('\n');
    let message: Arc<str> = Arc::from(line);
    self.stats.published += 1;

    let mut delivered = 0;
    let mut subscribers = self.subscribers.lock().unwrap();
    subscribers.retain(|subscriber| {
      match subscriber.tx.try_send(message.clone()) {
        Ok(()) => {
          delivered += 1;
          true
        },
        Err(TrySendError::Full(_)) => {
          trace!("Subscriber {} is behind, dropped frame {}.", subscriber.peer, frame.frame_number);
          true
        },
        Err(TrySendError::Disconnected(_)) => {
          info!("Subscriber {} disconnected.", subscriber.peer);
          false
        },
      }
    });
    self.stats.delivered += delivered as u64;
    self.stats.dropped += (subscribers.len() - delivered) as u64;
    Ok(delivered)
  }
}

impl Drop for Publisher {
  fn drop(&mut self) {
    self.running.store(false, Ordering::SeqCst);
    if let Some(thread) = self.accept_thread.take() {
      let _ = thread.join();
    }
    for subscriber in self.subscribers.lock().unwrap().drain(..) {
      let _ = subscriber.stream.shutdown(Shutdown::Both);
    }
  }
}

fn accept_loop(
  listener: TcpListener,
  subscribers: Arc<Mutex<Vec<Subscriber>>>,
  running: Arc<AtomicBool>,
  queue_capacity: usize,
) {
  while running.load(Ordering::SeqCst) {
    match listener.accept() {
      Ok((stream, peer)) => {
        match add_subscriber(stream, peer, queue_capacity) {
          Ok(subscriber) => {
            info!("Subscriber {} connected.", peer);
            subscribers.lock().unwrap().push(subscriber);
          },
          Err(err) => warn!("Failed to set up subscriber {}: {:#}", peer, err),
        }
      },
      Err(err) if err.kind() == ErrorKind::WouldBlock => {
        std::thread::sleep(ACCEPT_POLL_INTERVAL);
      },
      Err(err) => {
        warn!("Accepting a subscriber failed: {}", err);
        std::thread::sleep(ACCEPT_POLL_INTERVAL);
      },
    }
  }
}

fn add_subscriber(stream: TcpStream, peer: SocketAddr, queue_capacity: usize) -> Result<Subscriber> {
  // Accepted sockets may inherit the listener's non-blocking mode.
  stream.set_nonblocking(false)?;
  stream.set_nodelay(true)?;
  let (tx, rx) = sync_channel(queue_capacity);
  let writer = stream.try_clone()?;
  std::thread::Builder::new()
    .name(format!("subscriber {}", peer))
    .spawn(move || write_loop(writer, rx, peer))?;
  Ok(Subscriber { peer, tx, stream })
}

fn write_loop(mut stream: TcpStream, rx: Receiver<Arc<str>>, peer: SocketAddr) {
  for message in rx {
    if let Err(err) = stream.write_all(message.as_bytes()) {
      debug!("Writing to subscriber {} failed: {}", peer, err);
      break;
    }
  }
  let _ = stream.shutdown(Shutdown::Both);
}
