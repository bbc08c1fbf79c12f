// Simulated rest-and-swing capture in the display convention (x lateral,
// y forward, z up), laid out per the default label table.

use crate::all::*;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::f64::consts::PI;

pub const CAPTURE_FPS: f64 = 200.;

const SHOULDER_HEIGHT: f64 = 1400.;
const SHOULDER_HALF_WIDTH: f64 = 180.;
const UPPER_ARM_LENGTH: f64 = 300.;
const SWING_AMPLITUDE_DEG: f64 = 15.;
const SWING_HZ: f64 = 0.8;
// The subject stands still for this long before swinging.
const REST_SECONDS: f64 = 1.;
const JITTER: f64 = 1.;
const OCCLUSION_PROBABILITY: f64 = 0.01;

// Marker position relative to the shoulder center, for an arm at `angle`
// from straight down. Forward swing is towards +y.
fn marker_offset(label: &str, side: Side, angle: f64) -> Vector3d {
  let down = Vector3d::new(0., angle.sin(), -angle.cos());
  let lateral = Vector3d::new(side.sign(), 0., 0.);
  let forward = Vector3d::new(0., 1., 0.);
  match &label[1..] {
    "AC" => Vector3d::new(0., 0., 40.),
    "AS" => 40. * forward,
    "PS" => -40. * forward,
    "AE" => UPPER_ARM_LENGTH * down + 20. * lateral,
    "PE" => UPPER_ARM_LENGTH * down - 20. * lateral,
    "LW" => 2. * UPPER_ARM_LENGTH * down + 25. * lateral,
    _ => 2. * UPPER_ARM_LENGTH * down - 25. * lateral,
  }
}

fn swing_angle(side: Side, t: f64) -> f64 {
  if t < REST_SECONDS { return 0. }
  let phase = 2. * PI * SWING_HZ * (t - REST_SECONDS);
  // Arms swing in antiphase.
  side.sign() * SWING_AMPLITUDE_DEG.to_radians() * phase.sin()
}

pub fn synthesize(frame_count: usize, seed: u64) -> Vec<Frame> {
  let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
  let labels = &*DEFAULT_LABEL_TABLE;
  let mut frames = Vec::with_capacity(frame_count);
  for i in 0..frame_count {
    let t = i as f64 / CAPTURE_FPS;
    let mut markers = labels.names().iter()
      .map(|label| {
        let side = if label.starts_with('L') { Side::Left } else { Side::Right };
        let shoulder = Vector3d::new(side.sign() * SHOULDER_HALF_WIDTH, 0., SHOULDER_HEIGHT);
        let jitter = Vector3d::new(
          rng.gen_range(-JITTER..JITTER),
          rng.gen_range(-JITTER..JITTER),
          rng.gen_range(-JITTER..JITTER),
        );
        shoulder + marker_offset(label, side, swing_angle(side, t)) + jitter
      })
      .collect::<Vec<_>>();
    if rng.gen_bool(OCCLUSION_PROBABILITY) {
      let k = rng.gen_range(0..markers.len());
      markers[k] = MarkerPoint::new(f64::NAN, f64::NAN, f64::NAN);
    }
    frames.push(Frame::new(i as u64, markers));
  }
  frames
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_deterministic() {
    let a = synthesize(50, 7);
    let b = synthesize(50, 7);
    let c = synthesize(50, 8);
    let same = |x: &[Frame], y: &[Frame]| {
      x.iter().zip(y).all(|(f, g)| {
        f.markers.iter().zip(&g.markers).all(|(p, q)| {
          (is_missing(p) && is_missing(q)) || p == q
        })
      })
    };
    assert!(same(&a, &b));
    assert!(!same(&a, &c));
  }

  #[test]
  fn test_rest_pose() {
    let frames = synthesize((CAPTURE_FPS * REST_SECONDS) as usize, 1);
    let samples: Vec<ArmPair> = frames.iter()
      .map(|f| extract(f, &DEFAULT_LABEL_TABLE, &AxisRemap::default()).unwrap())
      .collect();
    assert!(samples.iter().filter(|s| s.both().is_some()).count() > samples.len() / 2);
    let profile = calibrate(&samples).unwrap();
    assert!((profile.arm_length - UPPER_ARM_LENGTH).abs() < 2.);
    assert!(profile.left_offset.abs() < 2.);
    let complete = frames.iter().zip(&samples).filter(|(f, _)| f.missing_count() == 0);
    for (left, right) in complete.filter_map(|(_, s)| s.both()) {
      // Hanging along -z.
      assert!((left.bearing_deg - 180.).abs() < 1.);
      assert!((right.bearing_deg - 180.).abs() < 1.);
    }
  }

  #[test]
  fn test_swing_reaches_amplitude() {
    let frames = synthesize(1000, 2);
    let mut max_forward = 0f64;
    // A partly occluded group moves its landmark to the remaining members.
    for frame in frames.iter().filter(|f| f.missing_count() == 0) {
      let arms = extract(frame, &DEFAULT_LABEL_TABLE, &AxisRemap::default()).unwrap();
      if let Ok(right) = &arms.right {
        max_forward = max_forward.max(right.arm_vector[1]);
      }
    }
    let expected = UPPER_ARM_LENGTH * SWING_AMPLITUDE_DEG.to_radians().sin();
    assert!((max_forward - expected).abs() < 5.);
  }
}
