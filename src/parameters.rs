use crate::all::*;

// Consumer side settings shared by the `visualize` and `calibrate` commands.
#[derive(Debug, Clone)]
#[derive(clap::Parser)]
pub struct ParameterSet {
  // Publisher to subscribe to.
  #[clap(long, env = "PUBLISHER_SOCKET", default_value = DEFAULT_CONNECT)]
  pub endpoint: String,

  // Comma-separated marker names in frame order. Defaults to the 14-marker rig.
  #[clap(long)]
  pub labels: Option<String>,

  // Axis remap applied to landmarks before vectors are computed.
  #[clap(long)]
  pub swap_xy: bool,
  #[clap(long)]
  pub negate_axis: Option<Axis>,

  #[clap(long, default_value = "calibration.json")]
  pub calibration: PathBuf,

  // Target calculator.
  #[clap(long, default_value = "170")]
  pub swing_angle: f64,
  #[clap(long, default_value = "100")]
  pub lateral_separation: f64,

  // Redraw pacing.
  #[clap(long, default_value = "60")]
  pub render_fps: f64,
}

impl ParameterSet {
  pub fn axis_remap(&self) -> AxisRemap {
    AxisRemap {
      swap_xy: self.swap_xy,
      negate: self.negate_axis,
    }
  }

  pub fn label_table(&self) -> Result<LabelTable> {
    label_table(self.labels.as_deref())
  }

  pub fn calibration_store(&self) -> CalibrationStore {
    CalibrationStore::new(&self.calibration)
  }
}

impl Default for ParameterSet {
  fn default() -> ParameterSet {
    ParameterSet {
      endpoint: DEFAULT_CONNECT.to_string(),
      labels: None,
      swap_xy: false,
      negate_axis: None,
      calibration: PathBuf::from("calibration.json"),
      swing_angle: 170.,
      lateral_separation: 100.,
      render_fps: 60.,
    }
  }
}

pub fn label_table(labels: Option<&str>) -> Result<LabelTable> {
  match labels {
    Some(s) => LabelTable::parse(s).context("Invalid --labels."),
    None => Ok(DEFAULT_LABEL_TABLE.clone()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use clap::Parser;

  #[test]
  fn test_defaults_match_parser() {
    let parsed = ParameterSet::try_parse_from(["swingcue"]).unwrap();
    let default = ParameterSet::default();
    // The endpoint may come from the environment.
    assert_eq!(parsed.swing_angle, default.swing_angle);
    assert_eq!(parsed.lateral_separation, default.lateral_separation);
    assert_eq!(parsed.render_fps, default.render_fps);
    assert_eq!(parsed.calibration, default.calibration);
    assert_eq!(parsed.axis_remap(), AxisRemap::default());
    assert_eq!(parsed.label_table().unwrap().marker_count(), 14);
  }

  #[test]
  fn test_parse_overrides() {
    let parsed = ParameterSet::try_parse_from([
      "swingcue", "--swap-xy", "--negate-axis", "z", "--swing-angle", "150",
      "--labels", "RAC,LAC,RAS,RPS,LAS,LPS,RLW,RMW,LLW,LMW,RAE,RPE,LAE,LPE,STRN",
    ]).unwrap();
    assert_eq!(parsed.axis_remap(), AxisRemap { swap_xy: true, negate: Some(Axis::Z) });
    assert_eq!(parsed.swing_angle, 150.);
    assert_eq!(parsed.label_table().unwrap().marker_count(), 15);
    assert!(ParameterSet::try_parse_from(["swingcue", "--negate-axis", "w"]).is_err());
    assert!(label_table(Some("RAC,LAC")).is_err());
  }
}
