use crate::all::*;

use std::io::ErrorKind;

// Baseline arm geometry captured at rest.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibrationProfile {
  pub left_arm_length: f64,
  pub right_arm_length: f64,
  pub arm_length: f64,
  pub left_offset: f64,
  pub right_offset: f64,
}

impl CalibrationProfile {
  pub fn from_sides(
    left_arm_length: f64,
    right_arm_length: f64,
    left_offset: f64,
    right_offset: f64,
  ) -> CalibrationProfile {
    CalibrationProfile {
      left_arm_length,
      right_arm_length,
      arm_length: 0.5 * (left_arm_length + right_arm_length),
      left_offset,
      right_offset,
    }
  }

  pub fn offset(&self, side: Side) -> f64 {
    match side {
      Side::Left => self.left_offset,
      Side::Right => self.right_offset,
    }
  }

  fn validate(&self) -> Result<()> {
    let values = [
      ("left_arm_length", self.left_arm_length),
      ("right_arm_length", self.right_arm_length),
      ("arm_length", self.arm_length),
      ("left_offset", self.left_offset),
      ("right_offset", self.right_offset),
    ];
    for (name, value) in values {
      if !value.is_finite() {
        bail!("Calibration field {} is not a finite number.", name);
      }
    }
    Ok(())
  }
}

// Streaming mean over rest pose samples where both arms are visible.
#[derive(Default)]
pub struct Calibrator {
  n: usize,
  left_arm_length: f64,
  right_arm_length: f64,
  left_offset: f64,
  right_offset: f64,
}

impl Calibrator {
  pub fn new() -> Calibrator {
    Calibrator::default()
  }

  // Returns false if the sample was skipped.
  pub fn add(&mut self, sample: &ArmPair) -> bool {
    let (left, right) = match sample.both() {
      Some(x) => x,
      None => return false,
    };
    self.n += 1;
    self.left_arm_length += left.arm_vector.norm();
    self.right_arm_length += right.arm_vector.norm();
    self.left_offset += left.com_pos[1] - left.shoulder_pos[1];
    self.right_offset += right.com_pos[1] - right.shoulder_pos[1];
    true
  }

  pub fn sample_count(&self) -> usize {
    self.n
  }

  pub fn finish(&self) -> Result<CalibrationProfile> {
    if self.n == 0 {
      bail!("No rest pose samples with both arms visible.");
    }
    let n = self.n as f64;
    Ok(CalibrationProfile::from_sides(
      self.left_arm_length / n,
      self.right_arm_length / n,
      self.left_offset / n,
      self.right_offset / n,
    ))
  }
}

pub fn calibrate<'a, I: IntoIterator<Item = &'a ArmPair>>(samples: I) -> Result<CalibrationProfile> {
  let mut calibrator = Calibrator::new();
  for sample in samples {
    calibrator.add(sample);
  }
  calibrator.finish()
}

pub struct CalibrationStore {
  path: PathBuf,
}

impl CalibrationStore {
  pub fn new(path: &Path) -> CalibrationStore {
    CalibrationStore {
      path: path.to_path_buf(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  // `Ok(None)` if nothing has been calibrated yet.
  pub fn load(&self) -> Result<Option<CalibrationProfile>> {
    let s = match std::fs::read_to_string(&self.path) {
      Ok(s) => s,
      Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
      Err(err) => return Err(err)
        .context(format!("Failed to read file {}.", self.path.display())),
    };
    let profile: CalibrationProfile = serde_json::from_str(&s)
      .context(format!("Failed to parse {}.", self.path.display()))?;
    profile.validate()
      .context(format!("Failed to parse {}.", self.path.display()))?;
    Ok(Some(profile))
  }

  pub fn save(&self, profile: &CalibrationProfile) -> Result<()> {
    profile.validate()?;
    let s = serde_json::to_string_pretty(profile)?;
    std::fs::write(&self.path, s)
      .context(format!("Failed to write file {}.", self.path.display()))?;
    info!("Saved calibration to {}.", self.path.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("swingcue-{}-{}.json", name, std::process::id()))
  }

  fn arm(side: Side, shoulder_pos: Vector3d, com_pos: Vector3d) -> SideState {
    let arm_vector = com_pos - shoulder_pos;
    Ok(ArmState {
      side,
      shoulder_pos,
      com_pos,
      arm_vector,
      bearing_deg: bearing_deg(&arm_vector).unwrap(),
    })
  }

  fn rest_pose() -> Vec<ArmPair> {
    (0..10).map(|i| {
      let jitter = 0.1 * i as f64;
      ArmPair {
        frame_number: i,
        left: arm(Side::Left, Vector3d::new(0., 1000., 1400.), Vector3d::new(0., 1000. - 300. - jitter, 1400.)),
        right: arm(Side::Right, Vector3d::new(400., 1000., 1400.), Vector3d::new(400., 1000., 1400. - 320.)),
      }
    }).collect()
  }

  #[test]
  fn test_calibrate() {
    let samples = rest_pose();
    let profile = calibrate(&samples).unwrap();
    assert!((profile.left_arm_length - 300.45).abs() < 1e-9);
    assert!((profile.right_arm_length - 320.).abs() < 1e-9);
    assert!((profile.arm_length - 310.225).abs() < 1e-9);
    assert!((profile.left_offset + 300.45).abs() < 1e-9);
    assert!(profile.right_offset.abs() < 1e-9);
  }

  #[test]
  fn test_calibrate_idempotent() {
    let samples = rest_pose();
    let a = calibrate(&samples).unwrap();
    let b = calibrate(&samples).unwrap();
    assert!((a.arm_length - b.arm_length).abs() < 1e-12);
    assert!((a.left_offset - b.left_offset).abs() < 1e-12);
    assert!((a.right_offset - b.right_offset).abs() < 1e-12);
  }

  #[test]
  fn test_calibrate_skips_undefined() {
    let mut samples = rest_pose();
    samples[0].right = Err(Undefined::Occluded(Landmark::Shoulder(Side::Right)));
    let mut calibrator = Calibrator::new();
    assert!(!calibrator.add(&samples[0]));
    assert!(calibrator.add(&samples[1]));
    assert_eq!(calibrator.sample_count(), 1);

    let undefined = vec![samples[0].clone()];
    assert!(calibrate(&undefined).is_err());
    assert!(calibrate(&[]).is_err());
  }

  #[test]
  fn test_save_load() {
    let path = temp_path("save-load");
    let store = CalibrationStore::new(&path);
    let _ = std::fs::remove_file(&path);
    assert!(store.load().unwrap().is_none());

    let profile = CalibrationProfile::from_sides(600., 620., -580., -600.5);
    store.save(&profile).unwrap();
    assert_eq!(store.load().unwrap(), Some(profile));

    // Saving again replaces the previous profile.
    let profile = CalibrationProfile::from_sides(1., 2., 3., 4.);
    store.save(&profile).unwrap();
    assert_eq!(store.load().unwrap(), Some(profile));
    std::fs::remove_file(&path).unwrap();
  }

  #[test]
  fn test_load_missing_field() {
    let path = temp_path("missing-field");
    std::fs::write(&path, r#"{"left_arm_length": 1.0, "right_arm_length": 2.0, "arm_length": 1.5, "left_offset": 0.5}"#).unwrap();
    let err = CalibrationStore::new(&path).load().unwrap_err();
    assert!(format!("{:#}", err).contains("right_offset"));
    std::fs::remove_file(&path).unwrap();
  }

  #[test]
  fn test_load_unknown_field() {
    let path = temp_path("unknown-field");
    std::fs::write(&path, r#"{"left_arm_length": 1.0, "right_arm_length": 2.0, "arm_length": 1.5, "left_offset": 0.5, "right_offset": 0.5, "left_com_pos": 3}"#).unwrap();
    assert!(CalibrationStore::new(&path).load().is_err());
    std::fs::remove_file(&path).unwrap();
  }
}
