// Line-oriented JSON encoding of frames shared by the transport and recordings:
//   {"frame_number": 12, "markers": [[x, y, z], [null, null, null], ...]}
// Non-finite coordinates are written as `null` and decoded as NaN.

use crate::all::*;

#[derive(Serialize)]
struct WireFrameOut {
  frame_number: u64,
  markers: Vec<[Option<f64>; 3]>,
}

#[derive(Deserialize)]
struct WireFrameIn {
  #[serde(default)]
  frame_number: Option<u64>,
  #[serde(default)]
  markers: Vec<Vec<Option<f64>>>,
}

pub fn encode(frame: &Frame) -> Result<String> {
  let out = WireFrameOut {
    frame_number: frame.frame_number,
    markers: frame.markers.iter()
      .map(|p| [coordinate_out(p[0]), coordinate_out(p[1]), coordinate_out(p[2])])
      .collect(),
  };
  serde_json::to_string(&out).context("Failed to encode frame.")
}

fn coordinate_out(x: f64) -> Option<f64> {
  if x.is_finite() { Some(x) } else { None }
}

// `Ok(None)` for a well-formed document without a frame number.
pub fn decode(s: &str) -> Result<Option<Frame>> {
  let document: WireFrameIn = serde_json::from_str(s.trim())
    .context("Malformed frame document.")?;
  let markers = document.markers.iter()
    .enumerate()
    .map(|(i, m)| {
      if m.len() != 3 {
        bail!("Marker {} has {} coordinates, expected 3.", i, m.len());
      }
      Ok(MarkerPoint::new(
        m[0].unwrap_or(f64::NAN),
        m[1].unwrap_or(f64::NAN),
        m[2].unwrap_or(f64::NAN),
      ))
    })
    .collect::<Result<Vec<_>>>()?;
  Ok(document.frame_number.map(|frame_number| Frame::new(frame_number, markers)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_trip() {
    let frame = Frame::new(42, vec![
      MarkerPoint::new(1.5, -2.25, 1000.125),
      MarkerPoint::new(0.1, 0.2, 0.3),
      MarkerPoint::new(-1e-9, 123456.789, 0.),
    ]);
    let s = encode(&frame).unwrap();
    assert!(!s.contains('\n'));
    let decoded = decode(&s).unwrap().unwrap();
    assert_eq!(decoded.frame_number, 42);
    assert_eq!(decoded.markers.len(), 3);
    for (a, b) in frame.markers.iter().zip(&decoded.markers) {
      assert!((a - b).norm() < 1e-12);
    }
  }

  #[test]
  fn test_missing_markers() {
    let frame = Frame::new(7, vec![
      MarkerPoint::new(f64::NAN, f64::NAN, f64::NAN),
      MarkerPoint::new(1., 2., 3.),
    ]);
    let s = encode(&frame).unwrap();
    assert!(s.contains("[null,null,null]"));
    let decoded = decode(&s).unwrap().unwrap();
    assert!(is_missing(&decoded.markers[0]));
    assert_eq!(decoded.markers[1], MarkerPoint::new(1., 2., 3.));
  }

  #[test]
  fn test_decode_failures() {
    assert!(decode("not json").is_err());
    assert!(decode("{\"frame_number\": 1, \"markers\": [[1, 2]]}").is_err());
    assert!(decode("{\"frame_number\": -1, \"markers\": []}").is_err());
    assert!(decode("{\"frame_number\": 1, \"markers\": [[\"a\", 2, 3]]}").is_err());
  }

  #[test]
  fn test_decode_without_frame_number() {
    assert!(decode("{\"markers\": [[1, 2, 3]]}").unwrap().is_none());
    let frame = decode("{\"frame_number\": 3}\n").unwrap().unwrap();
    assert_eq!(frame.frame_number, 3);
    assert!(frame.markers.is_empty());
  }
}
