use crate::all::*;

// Desired center of mass positions at the two ends of the swing, in display
// coordinates relative to the shoulder.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetPair {
  pub forward_pos: Vector2d,
  pub backward_pos: Vector2d,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Targets {
  pub left: TargetPair,
  pub right: TargetPair,
}

impl Targets {
  pub fn side(&self, side: Side) -> &TargetPair {
    match side {
      Side::Left => &self.left,
      Side::Right => &self.right,
    }
  }
}

pub fn swing_amplitude(profile: &CalibrationProfile, swing_angle_deg: f64) -> f64 {
  swing_angle_deg.to_radians().sin() * profile.arm_length
}

pub fn targets(
  profile: &CalibrationProfile,
  swing_angle_deg: f64,
  lateral_separation: f64,
) -> Targets {
  let amplitude = swing_amplitude(profile, swing_angle_deg);
  let pair = |side: Side| {
    let x = side.sign() * lateral_separation + profile.offset(side);
    TargetPair {
      forward_pos: Vector2d::new(x, amplitude),
      backward_pos: Vector2d::new(x, -amplitude),
    }
  };
  Targets {
    left: pair(Side::Left),
    right: pair(Side::Right),
  }
}

// Recomputes the targets only when the profile or the swing angle changes.
pub struct TargetCalculator {
  lateral_separation: f64,
  inputs: Option<(CalibrationProfile, f64)>,
  targets: Option<Targets>,
  recompute_count: usize,
}

impl TargetCalculator {
  pub fn new(lateral_separation: f64) -> TargetCalculator {
    TargetCalculator {
      lateral_separation,
      inputs: None,
      targets: None,
      recompute_count: 0,
    }
  }

  pub fn get(&mut self, profile: &CalibrationProfile, swing_angle_deg: f64) -> Targets {
    let inputs = (*profile, swing_angle_deg);
    match (&self.inputs, self.targets) {
      (Some(previous), Some(targets)) if *previous == inputs => targets,
      _ => {
        let targets = targets(profile, swing_angle_deg, self.lateral_separation);
        debug!("Swing targets for {}°: {:?}", swing_angle_deg, targets);
        self.inputs = Some(inputs);
        self.targets = Some(targets);
        self.recompute_count += 1;
        targets
      },
    }
  }

  pub fn recompute_count(&self) -> usize {
    self.recompute_count
  }
}
