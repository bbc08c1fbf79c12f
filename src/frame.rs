use crate::all::*;

// Marker position in capture units. NaN coordinates mark an occluded marker.
pub type MarkerPoint = Vector3d;

// One capture sample, as produced by a frame source.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
  pub frame_number: u64,
  pub markers: Vec<MarkerPoint>,
}

impl Frame {
  pub fn new(frame_number: u64, markers: Vec<MarkerPoint>) -> Frame {
    Frame {
      frame_number,
      markers,
    }
  }

  pub fn check_marker_count(&self, labels: &LabelTable) -> Result<()> {
    if self.markers.len() != labels.marker_count() {
      bail!("Frame {} has {} markers, expected {}.",
        self.frame_number, self.markers.len(), labels.marker_count());
    }
    Ok(())
  }

  pub fn missing_count(&self) -> usize {
    self.markers.iter().filter(|p| is_missing(p)).count()
  }
}
