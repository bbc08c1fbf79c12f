use crate::all::*;

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

pub enum Message {
  Frame(Frame),
  // A message arrived but did not hold a usable frame.
  Empty,
  // The publisher went away or the subscription was shut down.
  Closed,
}

pub struct FrameClient<R> {
  reader: R,
  line: Vec<u8>,
  received: u64,
  empty: u64,
}

const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

impl FrameClient<BufReader<TcpStream>> {
  // Keeps trying until the publisher accepts, so consumers may start first.
  // Returns `None` if shutdown is requested while waiting. The subscription
  // is closed when `shutdown` is requested.
  pub fn connect(endpoint: &str, shutdown: &ShutdownHandle) -> Result<Option<FrameClient<BufReader<TcpStream>>>> {
    let address = parse_endpoint(endpoint)?;
    let mut attempts = 0u64;
    let stream = loop {
      if shutdown.is_requested() {
        info!("Stopped waiting for a publisher at {}.", endpoint);
        return Ok(None);
      }
      match TcpStream::connect(&address) {
        Ok(stream) => break stream,
        Err(err) => {
          if attempts == 0 {
            info!("No publisher at {} yet ({}), retrying.", endpoint, err);
          }
          attempts += 1;
          std::thread::sleep(CONNECT_RETRY_INTERVAL);
        },
      }
    };
    stream.set_nodelay(true)?;
    shutdown.watch(&stream)?;
    info!("Subscribed to {}.", endpoint);
    Ok(Some(FrameClient::from_reader(BufReader::new(stream))))
  }
}

impl<R: BufRead> FrameClient<R> {
  pub fn from_reader(reader: R) -> FrameClient<R> {
    FrameClient {
      reader,
      line: Vec::new(),
      received: 0,
      empty: 0,
    }
  }

  // Blocks until a message arrives. Decoding problems are logged here and
  // never reach the caller as errors.
  pub fn receive(&mut self) -> Message {
    self.line.clear();
    loop {
      match self.reader.read_until(b'\n', &mut self.line) {
        Ok(0) => return Message::Closed,
        Ok(_) => break,
        Err(err) if err.kind() == ErrorKind::Interrupted => continue,
        Err(err) => {
          debug!("Subscription read failed: {}", err);
          return Message::Closed;
        },
      }
    }
    let line = match std::str::from_utf8(&self.line) {
      Ok(line) => line,
      Err(err) => {
        self.empty += 1;
        error!("Failed to decode message: {}", err);
        return Message::Empty;
      },
    };
    match wire::decode(line) {
      Ok(Some(frame)) => {
        self.received += 1;
        trace!("Received frame {} ({} markers).", frame.frame_number, frame.markers.len());
        Message::Frame(frame)
      },
      Ok(None) => {
        self.empty += 1;
        warn!("Received a message without a frame number.");
        Message::Empty
      },
      Err(err) => {
        self.empty += 1;
        error!("Failed to decode message: {:#}", err);
        Message::Empty
      },
    }
  }

  pub fn received_count(&self) -> u64 {
    self.received
  }

  pub fn empty_count(&self) -> u64 {
    self.empty
  }
}
