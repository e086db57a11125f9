/// Chart Registry: the single owner of every live chart instance.
///
/// Each slot hosts at most one instance. [`ChartRegistry::render`] always
/// disposes the instance currently bound to a slot before the surface is
/// asked to mount a new one, so two live instances never share a rendering
/// surface. Rendering into a slot whose surface has gone away is a safe
/// no-op ([`RenderOutcome::Detached`]).
use std::collections::HashMap;

use thiserror::Error;

use super::{ChartConfig, ChartSpec, SlotId};

/// Failure reported by a surface while mounting a chart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("chart kind '{0}' is not supported by this surface")]
    UnsupportedKind(String),
    #[error("slot '{0}' already hosts a live chart")]
    SlotOccupied(String),
    #[error("slot '{0}' has no rendering surface")]
    MissingSurface(String),
}

/// A place charts are drawn onto.
///
/// `mount` must never be called for a slot that still has a live instance;
/// the registry guarantees this.
pub trait ChartSurface {
    /// Handle to one mounted chart.
    type Instance;

    fn has_slot(&self, slot: &SlotId) -> bool;
    fn mount(&mut self, slot: &SlotId, config: &ChartConfig) -> Result<Self::Instance, RenderError>;
    fn dispose(&mut self, slot: &SlotId, instance: Self::Instance);
    fn set_visible(&mut self, slot: &SlotId, visible: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    /// The slot's surface no longer exists; nothing was drawn.
    Detached,
}

pub struct ChartRegistry<S: ChartSurface> {
    surface: S,
    live: HashMap<SlotId, S::Instance>,
}

impl<S: ChartSurface> ChartRegistry<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            live: HashMap::new(),
        }
    }

    /// Render `spec` into `slot`, replacing whatever was there.
    pub fn render(&mut self, slot: &SlotId, spec: &ChartSpec) -> Result<RenderOutcome, RenderError> {
        if !self.surface.has_slot(slot) {
            // The surface took its instance with it.
            self.live.remove(slot);
            return Ok(RenderOutcome::Detached);
        }

        if let Some(previous) = self.live.remove(slot) {
            self.surface.dispose(slot, previous);
        }

        let config = ChartConfig::from_spec(spec);
        let instance = self.surface.mount(slot, &config)?;
        self.live.insert(slot.clone(), instance);
        Ok(RenderOutcome::Rendered)
    }

    /// Dispose the chart in `slot` (if any) and hide its panel. Idempotent.
    pub fn clear(&mut self, slot: &SlotId) {
        let attached = self.surface.has_slot(slot);
        if let Some(instance) = self.live.remove(slot)
            && attached
        {
            self.surface.dispose(slot, instance);
        }
        if attached {
            self.surface.set_visible(slot, false);
        }
    }

    /// Make the panel holding `slot` visible.
    pub fn show(&mut self, slot: &SlotId) {
        if self.surface.has_slot(slot) {
            self.surface.set_visible(slot, true);
        }
    }

    pub fn is_live(&self, slot: &SlotId) -> bool {
        self.live.contains_key(slot)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::charts::Series;

    /// Surface double that tracks live instances and enforces the
    /// dispose-before-mount contract.
    #[derive(Default)]
    pub(crate) struct CountingSurface {
        pub slots: HashSet<SlotId>,
        pub live: HashMap<SlotId, u32>,
        pub visible: HashSet<SlotId>,
        pub mounted: u32,
        pub disposed: u32,
    }

    impl CountingSurface {
        pub fn with_slots(names: &[&str]) -> Self {
            Self {
                slots: names.iter().map(|n| SlotId::new(*n)).collect(),
                ..Self::default()
            }
        }
    }

    impl ChartSurface for CountingSurface {
        type Instance = u32;

        fn has_slot(&self, slot: &SlotId) -> bool {
            self.slots.contains(slot)
        }

        fn mount(&mut self, slot: &SlotId, _config: &ChartConfig) -> Result<u32, RenderError> {
            if self.live.contains_key(slot) {
                return Err(RenderError::SlotOccupied(slot.to_string()));
            }
            self.mounted += 1;
            self.live.insert(slot.clone(), self.mounted);
            Ok(self.mounted)
        }

        fn dispose(&mut self, slot: &SlotId, instance: u32) {
            assert_eq!(self.live.remove(slot), Some(instance));
            self.disposed += 1;
        }

        fn set_visible(&mut self, slot: &SlotId, visible: bool) {
            if visible {
                self.visible.insert(slot.clone());
            } else {
                self.visible.remove(slot);
            }
        }
    }

    fn spec(values: Vec<f64>) -> ChartSpec {
        let labels = (0..values.len()).map(|i| format!("l{i}")).collect();
        ChartSpec::new("bar", "t", labels, vec![Series::new("s", values)]).unwrap()
    }

    #[test]
    fn rendering_twice_leaves_one_live_instance() {
        let slot = SlotId::new("gender");
        let mut registry = ChartRegistry::new(CountingSurface::with_slots(&["gender"]));

        registry.render(&slot, &spec(vec![1.0, 2.0])).unwrap();
        registry.render(&slot, &spec(vec![3.0])).unwrap();

        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.surface().live.len(), 1);
        assert_eq!(registry.surface().mounted, 2);
        assert_eq!(registry.surface().disposed, 1);
    }

    #[test]
    fn many_renders_across_slots_never_leak() {
        let mut registry = ChartRegistry::new(CountingSurface::with_slots(&["a", "b"]));
        for i in 0..10 {
            let slot = SlotId::new(if i % 2 == 0 { "a" } else { "b" });
            registry.render(&slot, &spec(vec![i as f64])).unwrap();
        }
        assert_eq!(registry.live_count(), 2);
        assert_eq!(registry.surface().live.len(), 2);
        assert_eq!(registry.surface().mounted - registry.surface().disposed, 2);
    }

    #[test]
    fn render_into_missing_surface_is_a_no_op() {
        let mut registry = ChartRegistry::new(CountingSurface::with_slots(&[]));
        let outcome = registry.render(&SlotId::new("gone"), &spec(vec![1.0])).unwrap();
        assert_eq!(outcome, RenderOutcome::Detached);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.surface().mounted, 0);
    }

    #[test]
    fn slot_removed_after_render_detaches_cleanly() {
        let slot = SlotId::new("wards");
        let mut registry = ChartRegistry::new(CountingSurface::with_slots(&["wards"]));
        registry.render(&slot, &spec(vec![1.0])).unwrap();

        registry.surface_mut().slots.remove(&slot);
        registry.surface_mut().live.remove(&slot);

        assert_eq!(
            registry.render(&slot, &spec(vec![2.0])).unwrap(),
            RenderOutcome::Detached
        );
        assert!(!registry.is_live(&slot));
    }

    #[test]
    fn clear_is_idempotent_and_hides_panel() {
        let slot = SlotId::new("dynamic");
        let mut registry = ChartRegistry::new(CountingSurface::with_slots(&["dynamic"]));
        registry.render(&slot, &spec(vec![1.0])).unwrap();
        registry.show(&slot);
        assert!(registry.surface().visible.contains(&slot));

        registry.clear(&slot);
        registry.clear(&slot);

        assert!(!registry.is_live(&slot));
        assert!(!registry.surface().visible.contains(&slot));
        assert_eq!(registry.surface().disposed, 1);
    }
}
