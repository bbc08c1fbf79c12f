// Live capture. The capture SDK is reached through `DeviceConnector`, and the
// only concrete connector talks to a relay process that forwards the SDK's
// 3D marker packets as JSON lines.

use crate::all::*;

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::Duration;

pub const DEFAULT_DEVICE: &str = "tcp://127.0.0.1:22224";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// One packet as delivered by the capture system.
#[derive(Clone, Debug, Deserialize)]
pub struct DevicePacket {
  #[serde(rename = "framenumber")]
  pub frame_number: u64,
  pub markers: Vec<Vec<Option<f64>>>,
}

pub trait Device: Send {
  // `Ok(None)` once the device stops streaming.
  fn next_packet(&mut self) -> Result<Option<DevicePacket>>;
}

pub trait DeviceConnector: Send {
  fn connect(self: Box<Self>) -> Result<Box<dyn Device>>;
}

pub fn packet_to_frame(packet: &DevicePacket, labels: &LabelTable) -> Result<Frame> {
  if packet.markers.len() != labels.marker_count() {
    bail!("Packet {} has {} markers, expected {}.",
      packet.frame_number, packet.markers.len(), labels.marker_count());
  }
  let markers = packet.markers.iter()
    .enumerate()
    .map(|(i, m)| {
      if m.len() != 3 {
        bail!("Packet {} marker {} has {} coordinates.", packet.frame_number, i, m.len());
      }
      let p = MarkerPoint::new(
        m[0].unwrap_or(f64::NAN),
        m[1].unwrap_or(f64::NAN),
        m[2].unwrap_or(f64::NAN),
      );
      if p.iter().any(|x| x.is_infinite()) {
        bail!("Packet {} marker {} has an infinite coordinate.", packet.frame_number, i);
      }
      Ok(p)
    })
    .collect::<Result<Vec<_>>>()?;
  Ok(Frame::new(packet.frame_number, markers))
}

pub struct LiveSource {
  device: Box<dyn Device>,
  labels: LabelTable,
  dropped: u64,
}

impl LiveSource {
  // Runs the connector on a helper thread so that a hanging SDK call cannot
  // stall the caller beyond `timeout`. There is no retry.
  pub fn connect(
    connector: Box<dyn DeviceConnector>,
    labels: LabelTable,
    timeout: Duration,
  ) -> Result<LiveSource> {
    let (tx, rx) = channel();
    std::thread::Builder::new()
      .name("device connect".to_string())
      .spawn(move || {
        let _ = tx.send(connector.connect());
      })?;
    let device = match rx.recv_timeout(timeout) {
      Ok(device) => device.context("Failed to connect to the capture device.")?,
      Err(RecvTimeoutError::Timeout) => {
        bail!("Connection attempt to the capture device timed out after {:.1} s.", timeout.as_secs_f64())
      },
      Err(RecvTimeoutError::Disconnected) => bail!("Device connection attempt aborted."),
    };
    info!("Connected to the capture device.");
    Ok(LiveSource {
      device,
      labels,
      dropped: 0,
    })
  }

  pub fn dropped_count(&self) -> u64 {
    self.dropped
  }
}

impl FrameSource for LiveSource {
  fn next(&mut self) -> Result<Option<Frame>> {
    loop {
      let packet = match self.device.next_packet()? {
        Some(packet) => packet,
        None => {
          info!("Capture device closed the stream, {} malformed packets dropped.", self.dropped);
          return Ok(None);
        },
      };
      match packet_to_frame(&packet, &self.labels) {
        Ok(frame) => return Ok(Some(frame)),
        Err(err) => {
          self.dropped += 1;
          warn!("Dropping malformed packet. {:#}", err);
        },
      }
    }
  }
}

pub struct TcpDeviceConnector {
  endpoint: String,
  timeout: Duration,
  shutdown: ShutdownHandle,
}

impl TcpDeviceConnector {
  pub fn new(endpoint: &str, timeout: Duration, shutdown: &ShutdownHandle) -> TcpDeviceConnector {
    TcpDeviceConnector {
      endpoint: endpoint.to_string(),
      timeout,
      shutdown: shutdown.clone(),
    }
  }
}

impl DeviceConnector for TcpDeviceConnector {
  fn connect(self: Box<Self>) -> Result<Box<dyn Device>> {
    let address = parse_endpoint(&self.endpoint)?
      .to_socket_addrs()?
      .next()
      .ok_or(anyhow!("Could not resolve {}.", self.endpoint))?;
    info!("Connecting to capture device at {}.", self.endpoint);
    let stream = TcpStream::connect_timeout(&address, self.timeout)
      .context(format!("Failed to connect to {}.", self.endpoint))?;
    self.shutdown.watch(&stream)?;
    Ok(Box::new(TcpDevice {
      reader: BufReader::new(stream),
      line: Vec::new(),
    }))
  }
}

struct TcpDevice {
  reader: BufReader<TcpStream>,
  line: Vec<u8>,
}

impl Device for TcpDevice {
  fn next_packet(&mut self) -> Result<Option<DevicePacket>> {
    loop {
      self.line.clear();
      match self.reader.read_until(b'\n', &mut self.line) {
        Ok(0) => return Ok(None),
        Err(err) => bail!("Failed to read from the capture device. {}", err),
        _ => {},
      }
      let line = match std::str::from_utf8(&self.line) {
        Ok(line) => line,
        Err(err) => {
          warn!("Dropping undecodable device packet: {}", err);
          continue;
        },
      };
      if line.trim().is_empty() { continue }
      match serde_json::from_str(line) {
        Ok(packet) => return Ok(Some(packet)),
        Err(err) => warn!("Dropping undecodable device packet: {}", err),
      }
    }
  }
}
