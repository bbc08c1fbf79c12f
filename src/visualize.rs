use crate::all::*;

pub const WINDOW_WIDTH: usize = 800;
pub const WINDOW_HEIGHT: usize = 800;
// Display units visible across the window.
pub const VIEW_RANGE: f64 = 500.;

const BACKGROUND: u32 = 0x101010;
const AXES: u32 = 0x505050;
const GUIDES: u32 = 0x282828;
const GUIDE_SPACING: f64 = 50.;
const MARKER_RADIUS: i32 = 8;

fn color(id: ElementId) -> u32 {
  let (full, dim) = match id.side() {
    Some(Side::Right) => (0xff2020, 0x801010),
    Some(Side::Left) => (0x2040ff, 0x102080),
    None => (0xffffff, 0xffffff),
  };
  match id {
    ElementId::Com(_) => full,
    _ => dim,
  }
}

// Pixel rectangle covered by a drawn value, inclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Footprint {
  min: Pixel,
  max: Pixel,
}

impl Footprint {
  fn around(p: &Pixel, r: i32) -> Footprint {
    Footprint {
      min: p - Pixel::new(r, r),
      max: p + Pixel::new(r, r),
    }
  }

  fn overlaps(&self, other: &Footprint) -> bool {
    self.min[0] <= other.max[0] && other.min[0] <= self.max[0]
      && self.min[1] <= other.max[1] && other.min[1] <= self.max[1]
  }
}

// Software framebuffer for the window. The static background is kept aside
// so that moving an element only touches the pixels around it.
pub struct FramebufferCanvas {
  pub buffer: Vec<u32>,
  background: Vec<u32>,
  width: usize,
  height: usize,
  scale: f64,
  painted: Vec<(ElementId, Pixel)>,
  // Text elements, shown together in the window title.
  texts: Vec<(ElementId, String)>,
  title_changed: bool,
  touched: bool,
  dirty: bool,
}

#[inline(always)]
fn draw_pixel(buffer: &mut [u32], width: usize, height: usize, p: &Pixel, v: u32) {
  if p[0] < 0 || p[0] >= width as i32 { return }
  if p[1] < 0 || p[1] >= height as i32 { return }
  buffer[p[1] as usize * width + p[0] as usize] = v;
}

fn draw_line(buffer: &mut [u32], width: usize, height: usize, mut p0: Pixel, mut p1: Pixel, v: u32) {
  let dx = p1[0] - p0[0];
  let dy = p1[1] - p0[1];
  if dx.abs() < dy.abs() {
    if p0[1] > p1[1] { (p0, p1) = (p1, p0); }
    let k = dx as f32 / dy as f32;
    for y in p0[1] ..= p1[1] {
      let x = p0[0] + (k * (y - p0[1]) as f32).round() as i32;
      draw_pixel(buffer, width, height, &Pixel::new(x, y), v);
    }
  }
  else {
    if p0[0] > p1[0] { (p0, p1) = (p1, p0); }
    if dx == 0 {
      draw_pixel(buffer, width, height, &p0, v);
      return;
    }
    let k = dy as f32 / dx as f32;
    for x in p0[0] ..= p1[0] {
      let y = p0[1] + (k * (x - p0[0]) as f32).round() as i32;
      draw_pixel(buffer, width, height, &Pixel::new(x, y), v);
    }
  }
}

impl FramebufferCanvas {
  pub fn new(width: usize, height: usize, view_range: f64) -> FramebufferCanvas {
    let mut canvas = FramebufferCanvas {
      buffer: vec![],
      background: vec![BACKGROUND; width * height],
      width,
      height,
      scale: width.min(height) as f64 / view_range,
      painted: vec![],
      texts: vec![],
      title_changed: false,
      touched: false,
      dirty: true,
    };
    canvas.draw_background(view_range);
    canvas.buffer = canvas.background.clone();
    canvas
  }

  fn draw_background(&mut self, view_range: f64) {
    let (w, h) = (self.width, self.height);
    let half = 0.5 * view_range;
    let n = (half / GUIDE_SPACING).floor() as i32;
    for i in -n..=n {
      let t = i as f64 * GUIDE_SPACING;
      let v = if i == 0 { AXES } else { GUIDES };
      let a = self.to_pixel(&Vector2d::new(t, -half));
      let b = self.to_pixel(&Vector2d::new(t, half));
      draw_line(&mut self.background, w, h, a, b, v);
      let a = self.to_pixel(&Vector2d::new(-half, t));
      let b = self.to_pixel(&Vector2d::new(half, t));
      draw_line(&mut self.background, w, h, a, b, v);
    }
    // Axes over the guides.
    let c = self.to_pixel(&Vector2d::zeros());
    draw_line(&mut self.background, w, h, Pixel::new(0, c[1]), Pixel::new(w as i32 - 1, c[1]), AXES);
    draw_line(&mut self.background, w, h, Pixel::new(c[0], 0), Pixel::new(c[0], h as i32 - 1), AXES);
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  // Display y grows upwards, pixel rows downwards.
  pub fn to_pixel(&self, p: &Vector2d) -> Pixel {
    let center = Vector2d::new(0.5 * self.width as f64, 0.5 * self.height as f64);
    from_f64(&Vector2d::new(center[0] + self.scale * p[0], center[1] - self.scale * p[1]))
  }

  pub fn pixel(&self, p: &Pixel) -> Option<u32> {
    if p[0] < 0 || p[0] >= self.width as i32 { return None }
    if p[1] < 0 || p[1] >= self.height as i32 { return None }
    Some(self.buffer[p[1] as usize * self.width + p[0] as usize])
  }

  pub fn background_pixel(&self, p: &Pixel) -> Option<u32> {
    self.pixel(p)?;
    Some(self.background[p[1] as usize * self.width + p[0] as usize])
  }

  fn restore(&mut self, footprint: &Footprint) {
    for y in footprint.min[1].max(0) ..= footprint.max[1].min(self.height as i32 - 1) {
      for x in footprint.min[0].max(0) ..= footprint.max[0].min(self.width as i32 - 1) {
        let i = y as usize * self.width + x as usize;
        self.buffer[i] = self.background[i];
      }
    }
  }

  fn fill_square(&mut self, p: &Pixel, r: i32, v: u32) {
    for y in -r..=r {
      for x in -r..=r {
        draw_pixel(&mut self.buffer, self.width, self.height, &(p + Pixel::new(x, y)), v);
      }
    }
  }

  fn paint(&mut self, id: ElementId, p: &Pixel) {
    let v = color(id);
    match id {
      // Targets are outlined so that a COM on top of one stays visible.
      ElementId::ForwardTarget(_) | ElementId::BackwardTarget(_) => {
        for r in MARKER_RADIUS - 2 ..= MARKER_RADIUS {
          for z in (-r)..(r+1) {
            for q in [Pixel::new(z, -r), Pixel::new(z, r), Pixel::new(-r, z), Pixel::new(r, z)] {
              draw_pixel(&mut self.buffer, self.width, self.height, &(p + q), v);
            }
          }
        }
      },
      _ => self.fill_square(p, MARKER_RADIUS - 2, v),
    }
  }

  // Returns the new title once after every change.
  pub fn take_title(&mut self) -> Option<String> {
    if !self.title_changed { return None }
    self.title_changed = false;
    let parts: Vec<&str> = ElementId::ALL.iter()
      .filter_map(|id| self.texts.iter().find(|(x, _)| x == id))
      .map(|(_, text)| text.as_str())
      .collect();
    Some(parts.join("   "))
  }

  // True if a blit left new content to present since the previous call.
  pub fn take_dirty(&mut self) -> bool {
    std::mem::replace(&mut self.dirty, false)
  }
}

impl Canvas<ElementId> for FramebufferCanvas {
  fn draw(&mut self, id: ElementId, _previous: Option<&ElementValue>, value: &ElementValue) {
    if let Some(k) = self.texts.iter().position(|(x, _)| *x == id) {
      self.texts.remove(k);
      self.title_changed = true;
    }
    if let ElementValue::Text(text) = value {
      self.texts.push((id, text.clone()));
      self.title_changed = true;
      return;
    }

    if let Some(k) = self.painted.iter().position(|(x, _)| *x == id) {
      let (_, old) = self.painted.remove(k);
      let erased = Footprint::around(&old, MARKER_RADIUS);
      self.restore(&erased);
      // Repaint what the erase cut into, in paint order.
      let painted = self.painted.clone();
      for (other, p) in &painted {
        if Footprint::around(p, MARKER_RADIUS).overlaps(&erased) {
          self.paint(*other, p);
        }
      }
      self.touched = true;
    }

    if let ElementValue::Point(p) = value {
      let p = self.to_pixel(p);
      self.paint(id, &p);
      self.painted.push((id, p));
      self.touched = true;
    }
  }

  fn blit(&mut self) {
    if self.touched {
      self.dirty = true;
      self.touched = false;
    }
  }
}

// Headless canvas.
#[derive(Default)]
pub struct LogCanvas {
  blits: usize,
}

impl LogCanvas {
  pub fn new() -> LogCanvas {
    LogCanvas::default()
  }

  pub fn blit_count(&self) -> usize {
    self.blits
  }
}

impl Canvas<ElementId> for LogCanvas {
  fn draw(&mut self, id: ElementId, _previous: Option<&ElementValue>, value: &ElementValue) {
    match value {
      ElementValue::Point(p) => info!("{:?} at ({:.1}, {:.1})", id, p[0], p[1]),
      ElementValue::Text(text) => info!("{:?}: {}", id, text),
      ElementValue::Hidden => info!("{:?} hidden", id),
    }
  }

  fn blit(&mut self) {
    self.blits += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn canvas() -> FramebufferCanvas {
    FramebufferCanvas::new(200, 200, 100.)
  }

  fn point(x: f64, y: f64) -> ElementValue {
    ElementValue::Point(Vector2d::new(x, y))
  }

  #[test]
  fn test_to_pixel() {
    let c = canvas();
    assert_eq!(c.to_pixel(&Vector2d::zeros()), Pixel::new(100, 100));
    assert_eq!(c.to_pixel(&Vector2d::new(10., 10.)), Pixel::new(120, 80));
    assert_eq!(c.to_pixel(&Vector2d::new(-50., -50.)), Pixel::new(0, 200));
  }

  #[test]
  fn test_background_has_axes() {
    let c = canvas();
    assert_eq!(c.pixel(&Pixel::new(100, 3)), Some(AXES));
    assert_eq!(c.pixel(&Pixel::new(3, 100)), Some(AXES));
    assert_eq!(c.pixel(&Pixel::new(3, 3)), Some(BACKGROUND));
    assert_eq!(c.pixel(&Pixel::new(-1, 3)), None);
  }

  #[test]
  fn test_move_restores_background() {
    let mut c = canvas();
    let id = ElementId::Com(Side::Right);
    let first = point(20., 20.);
    c.draw(id, None, &first);
    let p0 = c.to_pixel(&Vector2d::new(20., 20.));
    assert_eq!(c.pixel(&p0), Some(color(id)));
    c.blit();
    assert!(c.take_dirty());
    assert!(!c.take_dirty());

    c.draw(id, Some(&first), &point(-20., -20.));
    assert!(!c.take_dirty());
    c.blit();
    assert_eq!(c.pixel(&p0), c.background_pixel(&p0));
    let p1 = c.to_pixel(&Vector2d::new(-20., -20.));
    assert_eq!(c.pixel(&p1), Some(color(id)));
    assert!(c.take_dirty());

    c.draw(id, Some(&point(-20., -20.)), &ElementValue::Hidden);
    assert_eq!(c.pixel(&p1), c.background_pixel(&p1));
    assert_eq!(c.buffer, c.background);
  }

  #[test]
  fn test_overlapping_element_is_repainted() {
    let mut c = canvas();
    let target = ElementId::ForwardTarget(Side::Left);
    let com = ElementId::Com(Side::Left);
    c.draw(target, None, &point(0., 0.));
    c.draw(com, None, &point(2., 0.));
    // Moving the COM away must not leave a hole in the target outline.
    c.draw(com, Some(&point(2., 0.)), &point(40., 40.));
    let edge = c.to_pixel(&Vector2d::zeros()) + Pixel::new(MARKER_RADIUS, 0);
    assert_eq!(c.pixel(&edge), Some(color(target)));
    let center = c.to_pixel(&Vector2d::zeros());
    assert_eq!(c.pixel(&center), c.background_pixel(&center));
  }

  #[test]
  fn test_text_sets_title() {
    let mut c = canvas();
    assert_eq!(c.take_title(), None);
    c.draw(ElementId::FrameLabel, None, &ElementValue::Text("frame 3".to_string()));
    assert_eq!(c.take_title(), Some("frame 3".to_string()));
    assert_eq!(c.take_title(), None);

    c.draw(ElementId::Bearing(Side::Left), None, &ElementValue::Text("L: 180.0°".to_string()));
    c.draw(ElementId::Bearing(Side::Right), None, &ElementValue::Text("R: 90.0°".to_string()));
    assert_eq!(c.take_title(), Some("frame 3   R: 90.0°   L: 180.0°".to_string()));
    let label = ElementValue::Text("frame 3".to_string());
    c.draw(ElementId::FrameLabel, Some(&label), &ElementValue::Text("frame 4".to_string()));
    assert_eq!(c.take_title(), Some("frame 4   R: 90.0°   L: 180.0°".to_string()));
    assert_eq!(c.buffer, c.background);
  }

  #[test]
  fn test_log_canvas() {
    let mut sync = RenderSynchronizer::new(None);
    sync.register(ElementId::ALL).unwrap();
    sync.set(ElementId::Com(Side::Left), point(1., 2.)).unwrap();
    sync.set(ElementId::Bearing(Side::Left), ElementValue::Text("L: 180.0°".to_string())).unwrap();
    let mut c = LogCanvas::new();
    assert_eq!(sync.update(&mut c), 2);
    assert_eq!(sync.update(&mut c), 0);
    assert_eq!(c.blit_count(), 1);
  }
}
