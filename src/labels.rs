use crate::all::*;

use std::fmt;

// Marker order streamed by the reference rig. The elbow epicondyle markers
// (RME, RLE, LME, LLE) were removed from the marker set.
pub const DEFAULT_LABELS: [&str; 14] = [
  "RAC", "LAC",
  "RAS", "RPS", "LAS", "LPS",
  "RLW", "RMW", "LLW", "LMW",
  "RAE", "RPE", "LAE", "LPE",
];

lazy_static! {
  pub static ref DEFAULT_LABEL_TABLE: LabelTable = LabelTable::new(
    DEFAULT_LABELS.iter().map(|x| x.to_string()).collect()
  ).expect("Default label table is invalid.");
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Landmark {
  Shoulder(Side),
  CenterOfMass(Side),
}

impl Landmark {
  pub const ALL: [Landmark; 4] = [
    Landmark::Shoulder(Side::Left),
    Landmark::Shoulder(Side::Right),
    Landmark::CenterOfMass(Side::Left),
    Landmark::CenterOfMass(Side::Right),
  ];

  // Marker names averaged into the landmark.
  fn member_labels(self) -> [&'static str; 2] {
    match self {
      Landmark::Shoulder(Side::Right) => ["RAS", "RPS"],
      Landmark::Shoulder(Side::Left) => ["LAS", "LPS"],
      Landmark::CenterOfMass(Side::Right) => ["RAE", "RPE"],
      Landmark::CenterOfMass(Side::Left) => ["LAE", "LPE"],
    }
  }

  fn index(self) -> usize {
    match self {
      Landmark::Shoulder(Side::Left) => 0,
      Landmark::Shoulder(Side::Right) => 1,
      Landmark::CenterOfMass(Side::Left) => 2,
      Landmark::CenterOfMass(Side::Right) => 3,
    }
  }
}

impl fmt::Display for Landmark {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Landmark::Shoulder(side) => write!(f, "{} shoulder", side.name()),
      Landmark::CenterOfMass(side) => write!(f, "{} center of mass", side.name()),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelGroup {
  pub landmark: Landmark,
  pub ids: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct LabelTable {
  names: Vec<String>,
  groups: [LabelGroup; 4],
}

impl LabelTable {
  pub fn new(names: Vec<String>) -> Result<LabelTable> {
    for (i, name) in names.iter().enumerate() {
      if names[..i].contains(name) {
        bail!("Duplicate marker label {}.", name);
      }
    }
    let find = |label: &str| -> Result<usize> {
      names.iter().position(|x| x == label)
        .ok_or(anyhow!("Marker label {} is missing from the label table.", label))
    };
    let mut groups = vec![];
    for landmark in Landmark::ALL {
      let ids = landmark.member_labels().iter()
        .map(|label| find(label))
        .collect::<Result<Vec<_>>>()?;
      groups.push(LabelGroup { landmark, ids });
    }
    let groups: [LabelGroup; 4] = groups.try_into()
      .map_err(|_| anyhow!("Expected four label groups."))?;
    LabelTable::with_groups(names, groups)
  }

  // Groups given explicitly, eg for rigs whose marker naming differs.
  pub fn with_groups(names: Vec<String>, mut groups: [LabelGroup; 4]) -> Result<LabelTable> {
    groups.sort_by_key(|g| g.landmark.index());
    for (i, group) in groups.iter().enumerate() {
      if group.landmark.index() != i {
        bail!("Label groups must cover each landmark exactly once.");
      }
      if group.ids.is_empty() {
        bail!("Label group for {} is empty.", group.landmark);
      }
      if let Some(id) = group.ids.iter().find(|id| **id >= names.len()) {
        bail!("Label group for {} refers to marker {} but the table has {} markers.",
          group.landmark, id, names.len());
      }
    }
    Ok(LabelTable { names, groups })
  }

  pub fn parse(s: &str) -> Result<LabelTable> {
    let names = s.split(',')
      .map(|x| x.trim().to_string())
      .filter(|x| !x.is_empty())
      .collect();
    LabelTable::new(names).context(format!("Invalid label list \"{}\".", s))
  }

  pub fn marker_count(&self) -> usize {
    self.names.len()
  }

  pub fn names(&self) -> &[String] {
    &self.names
  }

  pub fn group(&self, landmark: Landmark) -> &LabelGroup {
    &self.groups[landmark.index()]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_table() {
    let table = &*DEFAULT_LABEL_TABLE;
    assert_eq!(table.marker_count(), 14);
    assert_eq!(table.group(Landmark::Shoulder(Side::Right)).ids, vec![2, 3]);
    assert_eq!(table.group(Landmark::Shoulder(Side::Left)).ids, vec![4, 5]);
    assert_eq!(table.group(Landmark::CenterOfMass(Side::Right)).ids, vec![10, 11]);
    assert_eq!(table.group(Landmark::CenterOfMass(Side::Left)).ids, vec![12, 13]);
    assert_eq!(table.names()[7], "RMW");
  }

  #[test]
  fn test_parse() {
    let table = LabelTable::parse("RAC, LAC, RAS, RPS, LAS, LPS, RLW, RMW, LLW, LMW, RAE, RPE, LAE, LPE, STRN, C7").unwrap();
    assert_eq!(table.marker_count(), 16);
    assert_eq!(table.group(Landmark::CenterOfMass(Side::Left)).ids, vec![12, 13]);

    assert!(LabelTable::parse("RAC,LAC").is_err());
    assert!(LabelTable::parse("RAS,RPS,LAS,LPS,RAE,RPE,LAE,LPE,RAS").is_err());
  }

  #[test]
  fn test_with_groups() {
    let names: Vec<String> = (0..6).map(|i| format!("M{}", i)).collect();
    let group = |landmark, ids: Vec<usize>| LabelGroup { landmark, ids };
    let table = LabelTable::with_groups(names.clone(), [
      group(Landmark::CenterOfMass(Side::Right), vec![5]),
      group(Landmark::Shoulder(Side::Left), vec![0, 1]),
      group(Landmark::CenterOfMass(Side::Left), vec![4]),
      group(Landmark::Shoulder(Side::Right), vec![2, 3]),
    ]).unwrap();
    assert_eq!(table.group(Landmark::Shoulder(Side::Right)).ids, vec![2, 3]);

    assert!(LabelTable::with_groups(names.clone(), [
      group(Landmark::Shoulder(Side::Left), vec![0]),
      group(Landmark::Shoulder(Side::Left), vec![1]),
      group(Landmark::CenterOfMass(Side::Left), vec![4]),
      group(Landmark::CenterOfMass(Side::Right), vec![5]),
    ]).is_err());
    assert!(LabelTable::with_groups(names.clone(), [
      group(Landmark::Shoulder(Side::Left), vec![0]),
      group(Landmark::Shoulder(Side::Right), vec![]),
      group(Landmark::CenterOfMass(Side::Left), vec![4]),
      group(Landmark::CenterOfMass(Side::Right), vec![5]),
    ]).is_err());
    assert!(LabelTable::with_groups(names, [
      group(Landmark::Shoulder(Side::Left), vec![0]),
      group(Landmark::Shoulder(Side::Right), vec![1]),
      group(Landmark::CenterOfMass(Side::Left), vec![4]),
      group(Landmark::CenterOfMass(Side::Right), vec![6]),
    ]).is_err());
  }
}
