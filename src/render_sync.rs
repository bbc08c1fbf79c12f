// Selective redraw. Each registered element remembers the value last handed
// to the canvas, and `update()` only draws the elements whose value moved
// since, followed by a single blit of the composite.

use crate::all::*;

use std::cell::Cell;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum ElementValue {
  Point(Vector2d),
  Text(String),
  Hidden,
}

pub trait Canvas<K> {
  // `previous` is what the canvas last drew for the element, if anything.
  fn draw(&mut self, id: K, previous: Option<&ElementValue>, value: &ElementValue);
  fn blit(&mut self);
}

#[derive(Debug)]
pub struct VisualElement<K> {
  pub id: K,
  pub last_rendered: Option<ElementValue>,
  pub current: Option<ElementValue>,
}

impl<K> VisualElement<K> {
  pub fn changed(&self) -> bool {
    self.current.is_some() && self.current != self.last_rendered
  }
}

pub struct RenderSynchronizer<K> {
  elements: Vec<VisualElement<K>>,
  pacer: Option<Pacer>,
  // Must stay on the thread that owns the canvas.
  _not_sync: PhantomData<Cell<()>>,
}

impl<K: Copy + PartialEq + Debug> RenderSynchronizer<K> {
  // Without a minimum interval every `update()` may redraw.
  pub fn new(min_interval: Option<Duration>) -> RenderSynchronizer<K> {
    RenderSynchronizer {
      elements: vec![],
      pacer: min_interval.map(Pacer::new),
      _not_sync: PhantomData,
    }
  }

  pub fn register<I: IntoIterator<Item = K>>(&mut self, ids: I) -> Result<()> {
    for id in ids {
      if self.elements.iter().any(|e| e.id == id) {
        bail!("Visual element {:?} is already registered.", id);
      }
      self.elements.push(VisualElement {
        id,
        last_rendered: None,
        current: None,
      });
    }
    Ok(())
  }

  pub fn set(&mut self, id: K, value: ElementValue) -> Result<()> {
    let element = self.elements.iter_mut().find(|e| e.id == id)
      .ok_or(anyhow!("Visual element {:?} is not registered.", id))?;
    element.current = Some(value);
    Ok(())
  }

  pub fn current(&self, id: K) -> Option<&ElementValue> {
    self.elements.iter().find(|e| e.id == id).and_then(|e| e.current.as_ref())
  }

  pub fn pending(&self) -> usize {
    self.elements.iter().filter(|e| e.changed()).count()
  }

  // Returns the number of elements drawn. Changes arriving faster than the
  // minimum interval stay pending until a later call.
  pub fn update<C: Canvas<K>>(&mut self, canvas: &mut C) -> usize {
    if self.pending() == 0 { return 0 }
    if let Some(pacer) = &mut self.pacer {
      if !pacer.ready() { return 0 }
    }
    self.draw_changed(canvas)
  }

  // Draws whatever is pending regardless of pacing, e.g. once the input ends.
  pub fn flush<C: Canvas<K>>(&mut self, canvas: &mut C) -> usize {
    if self.pending() == 0 { return 0 }
    self.draw_changed(canvas)
  }

  fn draw_changed<C: Canvas<K>>(&mut self, canvas: &mut C) -> usize {
    let mut n = 0;
    for element in &mut self.elements {
      if !element.changed() { continue }
      if let Some(value) = &element.current {
        canvas.draw(element.id, element.last_rendered.as_ref(), value);
        element.last_rendered = Some(value.clone());
        n += 1;
      }
    }
    canvas.blit();
    trace!("Redrew {} of {} elements.", n, self.elements.len());
    n
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Default)]
  struct RecordingCanvas {
    draws: Vec<(usize, Option<ElementValue>, ElementValue)>,
    blits: usize,
  }

  impl Canvas<usize> for RecordingCanvas {
    fn draw(&mut self, id: usize, previous: Option<&ElementValue>, value: &ElementValue) {
      self.draws.push((id, previous.cloned(), value.clone()));
    }

    fn blit(&mut self) {
      self.blits += 1;
    }
  }

  fn point(x: f64, y: f64) -> ElementValue {
    ElementValue::Point(Vector2d::new(x, y))
  }

  #[test]
  fn test_first_update_draws_everything() {
    let mut sync = RenderSynchronizer::<usize>::new(None);
    sync.register([0, 1, 2]).unwrap();
    sync.set(0, point(1., 2.)).unwrap();
    sync.set(1, ElementValue::Text("frame 1".to_string())).unwrap();
    sync.set(2, ElementValue::Hidden).unwrap();
    let mut canvas = RecordingCanvas::default();
    assert_eq!(sync.update(&mut canvas), 3);
    assert_eq!(canvas.blits, 1);
    assert!(canvas.draws.iter().all(|(_, previous, _)| previous.is_none()));
  }

  #[test]
  fn test_only_changed_elements_are_drawn() {
    let mut sync = RenderSynchronizer::<usize>::new(None);
    sync.register([0, 1, 2]).unwrap();
    let mut canvas = RecordingCanvas::default();
    for i in 0..3 {
      sync.set(i, point(i as f64, 0.)).unwrap();
    }
    sync.update(&mut canvas);
    canvas.draws.clear();

    sync.set(0, point(0., 0.)).unwrap();
    sync.set(1, point(5., 5.)).unwrap();
    sync.set(2, point(2., 0.)).unwrap();
    assert_eq!(sync.pending(), 1);
    assert_eq!(sync.update(&mut canvas), 1);
    assert_eq!(canvas.draws, vec![(1, Some(point(1., 0.)), point(5., 5.))]);
    assert_eq!(canvas.blits, 2);

    // Nothing changed, no draw and no blit.
    assert_eq!(sync.update(&mut canvas), 0);
    assert_eq!(canvas.blits, 2);
  }

  #[test]
  fn test_unset_elements_are_skipped() {
    let mut sync = RenderSynchronizer::<usize>::new(None);
    sync.register([0, 1]).unwrap();
    sync.set(1, point(1., 1.)).unwrap();
    let mut canvas = RecordingCanvas::default();
    assert_eq!(sync.update(&mut canvas), 1);
    assert_eq!(canvas.draws[0].0, 1);
    assert!(sync.current(0).is_none());
    assert_eq!(sync.current(1), Some(&point(1., 1.)));
  }

  #[test]
  fn test_registration_errors() {
    let mut sync = RenderSynchronizer::<usize>::new(None);
    sync.register([0]).unwrap();
    assert!(sync.register([0]).is_err());
    assert!(sync.set(3, ElementValue::Hidden).is_err());
  }

  #[test]
  fn test_pacing_keeps_changes_pending() {
    let mut sync = RenderSynchronizer::<usize>::new(Some(Duration::from_secs(3600)));
    sync.register([0]).unwrap();
    let mut canvas = RecordingCanvas::default();
    sync.set(0, point(0., 0.)).unwrap();
    assert_eq!(sync.update(&mut canvas), 1);
    sync.set(0, point(1., 0.)).unwrap();
    assert_eq!(sync.update(&mut canvas), 0);
    assert_eq!(sync.pending(), 1);
    assert_eq!(canvas.blits, 1);

    assert_eq!(sync.flush(&mut canvas), 1);
    assert_eq!(sync.pending(), 0);
    assert_eq!(canvas.draws.last().unwrap().2, point(1., 0.));
    assert_eq!(canvas.blits, 2);
    assert_eq!(sync.flush(&mut canvas), 0);
    assert_eq!(canvas.blits, 2);
  }

  #[test]
  fn test_random_sequences_never_redraw_unchanged() {
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let mut sync = RenderSynchronizer::<usize>::new(None);
    sync.register(0..8).unwrap();
    let mut canvas = RecordingCanvas::default();
    let mut values = vec![None; 8];
    for _ in 0..200 {
      let mut changed = vec![];
      for (i, value) in values.iter_mut().enumerate() {
        if !rng.gen_bool(0.3) { continue }
        let v = point(rng.gen_range(0..3) as f64, 0.);
        if value.as_ref() != Some(&v) { changed.push(i) }
        *value = Some(v.clone());
        sync.set(i, v).unwrap();
      }
      canvas.draws.clear();
      sync.update(&mut canvas);
      let drawn: Vec<usize> = canvas.draws.iter().map(|d| d.0).collect();
      assert_eq!(drawn, changed);
    }
  }
}
