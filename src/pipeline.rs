// Wiring of the components into the producer and consumer loops.

use crate::all::*;

use std::sync::{Arc, Condvar};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementId {
  FrameLabel,
  // Text readout of the arm bearing, shown while the side is defined.
  Bearing(Side),
  Com(Side),
  ForwardTarget(Side),
  BackwardTarget(Side),
}

impl ElementId {
  pub const ALL: [ElementId; 9] = [
    ElementId::FrameLabel,
    ElementId::Bearing(Side::Right),
    ElementId::Bearing(Side::Left),
    ElementId::Com(Side::Left),
    ElementId::Com(Side::Right),
    ElementId::ForwardTarget(Side::Left),
    ElementId::ForwardTarget(Side::Right),
    ElementId::BackwardTarget(Side::Left),
    ElementId::BackwardTarget(Side::Right),
  ];

  pub fn side(self) -> Option<Side> {
    match self {
      ElementId::FrameLabel => None,
      ElementId::Bearing(side)
      | ElementId::Com(side)
      | ElementId::ForwardTarget(side)
      | ElementId::BackwardTarget(side) => Some(side),
    }
  }
}

pub const WAITING_STATUS: &str = "waiting for data";

pub fn publish_all(
  source: &mut dyn FrameSource,
  publisher: &mut Publisher,
  shutdown: &ShutdownHandle,
) -> Result<PublishStats> {
  while !shutdown.is_requested() {
    let frame = match source.next() {
      Ok(Some(frame)) => frame,
      Ok(None) => {
        info!("Frame source ended.");
        break;
      },
      // Shutdown closes the device socket under a blocked read.
      Err(err) if shutdown.is_requested() => {
        debug!("Frame source stopped: {:#}", err);
        break;
      },
      Err(err) => return Err(err),
    };
    let n = publisher.publish(&frame)?;
    debug!("Published frame {} ({} markers missing) to {} subscribers.",
      frame.frame_number, frame.missing_count(), n);
  }
  let stats = publisher.stats();
  info!("Published {} frames, {} deliveries, {} dropped.", stats.published, stats.delivered, stats.dropped);
  Ok(stats)
}

// Turns frames into scene element values.
pub struct Consumer {
  labels: LabelTable,
  remap: AxisRemap,
  swing_angle: f64,
  lateral_separation: f64,
  profile: Option<CalibrationProfile>,
  calculator: TargetCalculator,
  sync: RenderSynchronizer<ElementId>,
  processed: u64,
  rejected: u64,
}

impl Consumer {
  pub fn new(
    parameters: &ParameterSet,
    profile: Option<CalibrationProfile>,
  ) -> Result<Consumer> {
    let min_interval = interval_from_fps(parameters.render_fps)?;
    Consumer::with_min_interval(parameters, profile, Some(min_interval))
  }

  pub fn with_min_interval(
    parameters: &ParameterSet,
    profile: Option<CalibrationProfile>,
    min_interval: Option<Duration>,
  ) -> Result<Consumer> {
    let mut sync = RenderSynchronizer::new(min_interval);
    sync.register(ElementId::ALL)?;
    let mut consumer = Consumer {
      labels: parameters.label_table()?,
      remap: parameters.axis_remap(),
      swing_angle: parameters.swing_angle,
      lateral_separation: parameters.lateral_separation,
      profile,
      calculator: TargetCalculator::new(parameters.lateral_separation),
      sync,
      processed: 0,
      rejected: 0,
    };
    consumer.sync.set(ElementId::FrameLabel, ElementValue::Text(WAITING_STATUS.to_string()))?;
    if consumer.profile.is_none() {
      for id in ElementId::ALL {
        if let ElementId::ForwardTarget(_) | ElementId::BackwardTarget(_) = id {
          consumer.sync.set(id, ElementValue::Hidden)?;
        }
      }
    }
    Ok(consumer)
  }

  // Returns false if the frame was rejected.
  pub fn process(&mut self, frame: &Frame) -> Result<bool> {
    let arms = match extract(frame, &self.labels, &self.remap) {
      Ok(arms) => arms,
      Err(err) => {
        self.rejected += 1;
        warn!("Skipping frame. {:#}", err);
        return Ok(false);
      },
    };
    self.processed += 1;

    // An undefined side keeps its previous position.
    for side in Side::BOTH {
      if let Ok(arm) = arms.side(side) {
        let p = Vector2d::new(
          side.sign() * self.lateral_separation + arm.arm_vector[0],
          arm.arm_vector[1],
        );
        self.sync.set(ElementId::Com(side), ElementValue::Point(p))?;
        let bearing = format!("{}: {:.1}°", side.initial(), arm.bearing_deg);
        self.sync.set(ElementId::Bearing(side), ElementValue::Text(bearing))?;
      }
    }

    let label = match &self.profile {
      Some(profile) => {
        let targets = self.calculator.get(profile, self.swing_angle);
        for side in Side::BOTH {
          let pair = targets.side(side);
          self.sync.set(ElementId::ForwardTarget(side), ElementValue::Point(pair.forward_pos))?;
          self.sync.set(ElementId::BackwardTarget(side), ElementValue::Point(pair.backward_pos))?;
        }
        format!("frame {}", frame.frame_number)
      },
      None => format!("frame {} (not calibrated)", frame.frame_number),
    };
    self.sync.set(ElementId::FrameLabel, ElementValue::Text(label))?;
    Ok(true)
  }

  pub fn render<C: Canvas<ElementId>>(&mut self, canvas: &mut C) -> usize {
    self.sync.update(canvas)
  }

  pub fn flush<C: Canvas<ElementId>>(&mut self, canvas: &mut C) -> usize {
    self.sync.flush(canvas)
  }

  pub fn pending(&self) -> usize {
    self.sync.pending()
  }

  pub fn current(&self, id: ElementId) -> Option<&ElementValue> {
    self.sync.current(id)
  }

  pub fn processed_count(&self) -> u64 {
    self.processed
  }

  pub fn rejected_count(&self) -> u64 {
    self.rejected
  }
}

pub fn load_profile(store: &CalibrationStore) -> Result<Option<CalibrationProfile>> {
  let profile = store.load()?;
  match &profile {
    Some(profile) => info!("Loaded calibration from {}: {:?}", store.path().display(), profile),
    None => warn!("No calibration found at {}; run calibrate first.", store.path().display()),
  }
  Ok(profile)
}

// Sequential consumer loop used without a window.
pub fn consume<R: BufRead, C: Canvas<ElementId>>(
  client: &mut FrameClient<R>,
  consumer: &mut Consumer,
  canvas: &mut C,
  shutdown: &ShutdownHandle,
) -> Result<()> {
  loop {
    let message = client.receive();
    if shutdown.is_requested() { break }
    match message {
      Message::Frame(frame) => {
        consumer.process(&frame)?;
        consumer.render(canvas);
      },
      Message::Empty => {},
      Message::Closed => {
        info!("Publisher closed the connection.");
        break;
      },
    }
  }
  // Changes held back by pacing would otherwise never be shown.
  consumer.flush(canvas);
  info!("Processed {} frames, rejected {}, {} empty messages.",
    consumer.processed_count(), consumer.rejected_count(), client.empty_count());
  Ok(())
}

// Collects rest pose samples until `samples` of them had both arms visible.
// Returns `None` if interrupted.
pub fn collect_calibration<R: BufRead>(
  client: &mut FrameClient<R>,
  labels: &LabelTable,
  remap: &AxisRemap,
  samples: usize,
  shutdown: &ShutdownHandle,
) -> Result<Option<CalibrationProfile>> {
  if samples == 0 {
    bail!("Calibration needs at least one sample.");
  }
  let mut calibrator = Calibrator::new();
  while calibrator.sample_count() < samples {
    let message = client.receive();
    if shutdown.is_requested() {
      info!("Calibration aborted after {} of {} samples.", calibrator.sample_count(), samples);
      return Ok(None);
    }
    match message {
      Message::Frame(frame) => {
        let arms = match extract(&frame, labels, remap) {
          Ok(arms) => arms,
          Err(err) => {
            warn!("Skipping frame. {:#}", err);
            continue;
          },
        };
        if calibrator.add(&arms) && calibrator.sample_count() % 10 == 0 {
          info!("Collected {} of {} calibration samples.", calibrator.sample_count(), samples);
        }
      },
      Message::Empty => {},
      Message::Closed => {
        bail!("Publisher closed the connection after {} of {} calibration samples.",
          calibrator.sample_count(), samples);
      },
    }
  }
  Ok(Some(calibrator.finish()?))
}

#[derive(Default)]
struct Slot {
  frame: Option<Frame>,
  closed: bool,
  overwritten: u64,
}

// Single-slot handoff from the receiver thread to the window thread. A newer
// frame replaces an unconsumed older one.
#[derive(Default)]
pub struct LatestFrame {
  slot: Mutex<Slot>,
  changed: Condvar,
}

impl LatestFrame {
  pub fn new() -> LatestFrame {
    LatestFrame::default()
  }

  // Returns true if an unconsumed frame was replaced.
  pub fn put(&self, frame: Frame) -> bool {
    let mut slot = self.slot.lock().unwrap();
    let replaced = slot.frame.replace(frame).is_some();
    if replaced {
      slot.overwritten += 1;
    }
    self.changed.notify_all();
    replaced
  }

  pub fn take(&self) -> Option<Frame> {
    self.slot.lock().unwrap().frame.take()
  }

  pub fn close(&self) {
    self.slot.lock().unwrap().closed = true;
    self.changed.notify_all();
  }

  pub fn is_closed(&self) -> bool {
    self.slot.lock().unwrap().closed
  }

  pub fn overwritten_count(&self) -> u64 {
    self.slot.lock().unwrap().overwritten
  }

  // Blocks until a frame is available or the mailbox is closed.
  pub fn wait_timeout(&self, timeout: Duration) -> Option<Frame> {
    let slot = self.slot.lock().unwrap();
    let (mut slot, _) = self.changed
      .wait_timeout_while(slot, timeout, |slot| slot.frame.is_none() && !slot.closed)
      .unwrap();
    slot.frame.take()
  }
}

// Receives on a helper thread and calls `wake` after every mailbox change.
// Connects and then forwards frames into `mailbox` until the subscription
// closes. `wake` runs after every delivery and once more at the end.
pub fn spawn_receiver<R, C, W>(
  connect: C,
  mailbox: Arc<LatestFrame>,
  wake: W,
) -> Result<JoinHandle<()>>
where
  R: BufRead,
  C: FnOnce() -> Result<Option<FrameClient<R>>> + Send + 'static,
  W: Fn() + Send + 'static,
{
  let thread = std::thread::Builder::new()
    .name("receiver".to_string())
    .spawn(move || {
      match connect() {
        Ok(Some(mut client)) => {
          loop {
            match client.receive() {
              Message::Frame(frame) => {
                if mailbox.put(frame) {
                  trace!("Window is behind, replaced an unconsumed frame.");
                }
                wake();
              },
              Message::Empty => {},
              Message::Closed => break,
            }
          }
          debug!("Receiver stopped after {} frames.", client.received_count());
        },
        Ok(None) => {},
        Err(err) => error!("Failed to subscribe: {:#}", err),
      }
      mailbox.close();
      wake();
    })?;
  Ok(thread)
}
