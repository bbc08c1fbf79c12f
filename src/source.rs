use crate::all::*;

use std::io::Write;

// Not using `impl Iterator` to allow returning `Result`.
// End of data is signaled by `Result::Ok(Option::None)`.
pub trait FrameSource {
  fn next(&mut self) -> Result<Option<Frame>>;
}

// Recordings are JSON Lines files of wire-format frames.
pub fn load_recording(path: &Path) -> Result<Vec<Frame>> {
  let file = File::open(path)
    .context(format!("Failed to open recording {}.", path.display()))?;
  let mut reader = BufReader::new(file);
  let mut line = String::new();
  let mut frames = vec![];
  let mut line_number = 0;
  loop {
    line.clear();
    line_number += 1;
    match reader.read_line(&mut line) {
      Ok(0) => break,
      Err(err) => bail!("Failed to read line {} of {}. {}", line_number, path.display(), err),
      _ => {},
    }
    if line.trim().is_empty() { continue }
    let frame = wire::decode(&line)
      .context(format!("Bad frame on line {} of {}.", line_number, path.display()))?
      .ok_or(anyhow!("Frame on line {} of {} has no frame number.", line_number, path.display()))?;
    frames.push(frame);
  }
  Ok(frames)
}

pub fn write_recording(path: &Path, frames: &[Frame]) -> Result<()> {
  let file = File::create(path)
    .context(format!("Failed to create recording {}.", path.display()))?;
  let mut writer = std::io::BufWriter::new(file);
  for frame in frames {
    writeln!(writer, "{}", wire::encode(frame)?)?;
  }
  writer.flush()?;
  Ok(())
}

// Serves a recording at a fixed rate, keeping every `stride`-th frame.
pub struct ReplaySource {
  frames: Vec<Frame>,
  position: usize,
  stride: usize,
  pacer: Pacer,
}

impl ReplaySource {
  pub fn new(frames: Vec<Frame>, target_fps: f64, stride: usize) -> Result<ReplaySource> {
    if stride == 0 {
      bail!("Replay stride must be at least 1.");
    }
    Ok(ReplaySource {
      frames,
      position: 0,
      stride,
      pacer: Pacer::from_fps(target_fps)?,
    })
  }

  pub fn open(path: &Path, target_fps: f64, stride: usize) -> Result<ReplaySource> {
    let frames = load_recording(path)?;
    info!("Loaded {} frames from {}, replaying every {} at {} fps.",
      frames.len(), path.display(), stride, target_fps);
    ReplaySource::new(frames, target_fps, stride)
  }

  pub fn remaining(&self) -> usize {
    if self.position >= self.frames.len() { return 0 }
    (self.frames.len() - self.position - 1) / self.stride + 1
  }
}

impl FrameSource for ReplaySource {
  fn next(&mut self) -> Result<Option<Frame>> {
    if self.position >= self.frames.len() {
      return Ok(None);
    }
    let frame = self.frames[self.position].clone();
    self.position = self.position.saturating_add(self.stride);
    self.pacer.wait();
    Ok(Some(frame))
  }
}
