// Eigen-like aliases.
pub type Vector3d = nalgebra::Vector3::<f64>;
pub type Vector2d = nalgebra::Vector2::<f64>;
pub type Pixel = nalgebra::Vector2::<i32>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
  Left,
  Right,
}

impl Side {
  pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

  // Direction of the side along the display x axis.
  pub fn sign(self) -> f64 {
    match self {
      Side::Left => -1.,
      Side::Right => 1.,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Side::Left => "left",
      Side::Right => "right",
    }
  }

  pub fn initial(self) -> char {
    match self {
      Side::Left => 'L',
      Side::Right => 'R',
    }
  }
}

pub fn is_missing(p: &Vector3d) -> bool {
  p.iter().any(|x| x.is_nan())
}

pub fn from_f64(p: &Vector2d) -> Pixel {
  Pixel::new(p[0].round() as i32, p[1].round() as i32)
}
