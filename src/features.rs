use crate::all::*;

use std::f64::consts::PI;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
  X,
  Y,
  Z,
}

impl Axis {
  fn index(self) -> usize {
    match self {
      Axis::X => 0,
      Axis::Y => 1,
      Axis::Z => 2,
    }
  }
}

impl std::str::FromStr for Axis {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Axis> {
    match s.to_ascii_lowercase().as_str() {
      "x" => Ok(Axis::X),
      "y" => Ok(Axis::Y),
      "z" => Ok(Axis::Z),
      _ => bail!("Unknown axis {}.", s),
    }
  }
}

// Maps capture rig axes to the display convention. The swap happens before
// the negation, so `negate` refers to display axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisRemap {
  pub swap_xy: bool,
  pub negate: Option<Axis>,
}

impl AxisRemap {
  pub fn apply(&self, p: &Vector3d) -> Vector3d {
    let mut q = if self.swap_xy { Vector3d::new(p[1], p[0], p[2]) } else { *p };
    if let Some(axis) = self.negate {
      q[axis.index()] = -q[axis.index()];
    }
    q
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArmState {
  pub side: Side,
  pub shoulder_pos: Vector3d,
  pub com_pos: Vector3d,
  pub arm_vector: Vector3d,
  pub bearing_deg: f64,
}

// Why a side could not be computed for a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Undefined {
  Occluded(Landmark),
  ZeroLengthArm,
}

impl fmt::Display for Undefined {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Undefined::Occluded(landmark) => write!(f, "all {} markers are missing", landmark),
      Undefined::ZeroLengthArm => write!(f, "arm vector has zero length"),
    }
  }
}

pub type SideState = std::result::Result<ArmState, Undefined>;

#[derive(Clone, Debug)]
pub struct ArmPair {
  pub frame_number: u64,
  pub left: SideState,
  pub right: SideState,
}

impl ArmPair {
  pub fn side(&self, side: Side) -> &SideState {
    match side {
      Side::Left => &self.left,
      Side::Right => &self.right,
    }
  }

  pub fn both(&self) -> Option<(&ArmState, &ArmState)> {
    match (&self.left, &self.right) {
      (Ok(left), Ok(right)) => Some((left, right)),
      _ => None,
    }
  }
}

// Angle of the arm vector in the y-z plane, counted from display +z. Where
// 0 falls on the body depends on the rig's axes: an arm hanging along -y reads
// 90, and one hanging along -z reads 180 unless the rig is remapped with
// `--negate-axis z`, which makes the rest pose read 0.
pub fn bearing_deg(v: &Vector3d) -> Option<f64> {
  if !v.iter().all(|x| x.is_finite()) || v.norm() == 0. {
    return None;
  }
  let angle = v[2].atan2(v[1]) - PI / 2.;
  let bearing = angle.to_degrees().rem_euclid(360.);
  // `rem_euclid` rounds tiny negative angles up to exactly 360.
  Some(if bearing >= 360. { 0. } else { bearing })
}

// Mean of the group members that are not occluded.
pub fn landmark_position(frame: &Frame, group: &LabelGroup) -> Option<Vector3d> {
  let mut sum = Vector3d::zeros();
  let mut n = 0;
  for id in &group.ids {
    let p = &frame.markers[*id];
    if is_missing(p) { continue }
    sum += p;
    n += 1;
  }
  if n == 0 { return None }
  Some(sum / n as f64)
}

pub fn extract(frame: &Frame, labels: &LabelTable, remap: &AxisRemap) -> Result<ArmPair> {
  frame.check_marker_count(labels)?;
  let side_state = |side: Side| -> SideState {
    let position = |landmark: Landmark| {
      landmark_position(frame, labels.group(landmark))
        .map(|p| remap.apply(&p))
        .ok_or(Undefined::Occluded(landmark))
    };
    let shoulder_pos = position(Landmark::Shoulder(side))?;
    let com_pos = position(Landmark::CenterOfMass(side))?;
    let arm_vector = com_pos - shoulder_pos;
    let bearing_deg = bearing_deg(&arm_vector).ok_or(Undefined::ZeroLengthArm)?;
    Ok(ArmState {
      side,
      shoulder_pos,
      com_pos,
      arm_vector,
      bearing_deg,
    })
  };
  let pair = ArmPair {
    frame_number: frame.frame_number,
    left: side_state(Side::Left),
    right: side_state(Side::Right),
  };
  for side in Side::BOTH {
    if let Err(reason) = pair.side(side) {
      debug!("Frame {}: {} side undefined, {}.", frame.frame_number, side.name(), reason);
    }
  }
  Ok(pair)
}
