use crate::all::*;

use std::time::{Duration, Instant};

pub fn format_log(
  buf: &mut env_logger::fmt::Formatter,
  record: &log::Record,
) -> std::io::Result<()> {
  use std::io::Write;
  let mut style = buf.style();
  use env_logger::fmt::Color::*;
  use log::Level::*;
  style.set_color(match record.level() {
    Error => Red,
    Warn => Rgb(200, 200, 200),
    Info => Green,
    Debug => Magenta,
    Trace => Blue,
  });

  let s = format!("{:30}{}",
    format!("{}:{}",
      record.file().unwrap_or("?"),
      record.line().unwrap_or(0),
    ),
    record.args()
  );
  writeln!(buf, "{}", style.value(s))
}

pub fn init_logging() {
  // `RUST_LOG` still wins over the default level.
  env_logger::Builder::new()
    .filter_level(LevelFilter::Info)
    .parse_default_env()
    .format(format_log)
    .init();
}

pub fn interval_from_fps(fps: f64) -> Result<Duration> {
  if !(fps.is_finite() && fps > 0.) {
    bail!("Frame rate must be a positive number, got {}.", fps);
  }
  Ok(Duration::from_secs_f64(1. / fps))
}

// Fixed-rate pacing for emitters and redraws.
pub struct Pacer {
  interval: Duration,
  last: Option<Instant>,
}

impl Pacer {
  pub fn new(interval: Duration) -> Pacer {
    Pacer {
      interval,
      last: None,
    }
  }

  pub fn from_fps(fps: f64) -> Result<Pacer> {
    Ok(Pacer::new(interval_from_fps(fps)?))
  }

  // Sleep until one interval has passed since the previous call.
  pub fn wait(&mut self) {
    if let Some(last) = self.last {
      let elapsed = last.elapsed();
      if elapsed < self.interval {
        std::thread::sleep(self.interval - elapsed);
      }
    }
    self.last = Some(Instant::now());
  }

  // Non-blocking variant: true if an interval has passed, and marks the tick.
  pub fn ready(&mut self) -> bool {
    let now = Instant::now();
    match self.last {
      Some(last) if now.duration_since(last) < self.interval => false,
      _ => {
        self.last = Some(now);
        true
      },
    }
  }
}
