use crate::{
    core::geo::Point,
    input::events::SignalSender,
    layers::base::LayerTrait,
    MapError, Result,
};
use std::sync::{Arc, RwLock};

/// Ordered, name-addressed layer collection.
///
/// Readers (redraw workers, hit tests) take snapshots of the layer list, so
/// adding or removing a layer never waits for a redraw to finish.
#[derive(Default)]
pub struct LayerManager {
    /// Layers in draw order, bottom first
    layers: RwLock<Vec<Arc<dyn LayerTrait>>>,
    signals: Option<SignalSender>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager whose layers are attached to a map control's signal channel
    pub fn with_signals(signals: SignalSender) -> Self {
        Self {
            layers: RwLock::new(Vec::new()),
            signals: Some(signals),
        }
    }

    /// Adds a layer at `index`, appending when the index is absent or out of
    /// range. A layer with the same name is replaced in place and returned.
    pub fn add_layer(
        &self,
        layer: Arc<dyn LayerTrait>,
        index: Option<usize>,
    ) -> Result<Option<Arc<dyn LayerTrait>>> {
        let mut layers = self
            .layers
            .write()
            .map_err(|_| MapError::Layer("layer list poisoned".to_string()))?;

        if let Some(signals) = &self.signals {
            layer.attach(signals.clone());
        }

        if let Some(position) = layers.iter().position(|l| l.name() == layer.name()) {
            let replaced = std::mem::replace(&mut layers[position], layer);
            replaced.detach();
            log::debug!("replaced layer '{}'", replaced.name());
            return Ok(Some(replaced));
        }

        match index {
            Some(index) if index <= layers.len() => layers.insert(index, layer),
            _ => layers.push(layer),
        }
        Ok(None)
    }

    /// Removes a layer by name
    pub fn remove_layer(&self, name: &str) -> Result<Option<Arc<dyn LayerTrait>>> {
        let mut layers = self
            .layers
            .write()
            .map_err(|_| MapError::Layer("layer list poisoned".to_string()))?;
        let removed = layers
            .iter()
            .position(|l| l.name() == name)
            .map(|position| layers.remove(position));
        if let Some(layer) = &removed {
            layer.detach();
        }
        Ok(removed)
    }

    /// Gets a layer by name
    pub fn layer(&self, name: &str) -> Option<Arc<dyn LayerTrait>> {
        self.layers
            .read()
            .ok()?
            .iter()
            .find(|l| l.name() == name)
            .cloned()
    }

    /// Snapshot of every layer in draw order
    pub fn layers(&self) -> Vec<Arc<dyn LayerTrait>> {
        match self.layers.read() {
            Ok(layers) => layers.clone(),
            Err(_) => {
                log::warn!("layer list poisoned, drawing nothing");
                Vec::new()
            }
        }
    }

    /// Snapshot of the layers visible at `zoom`, in draw order
    pub fn visible_layers(&self, zoom: i32) -> Vec<Arc<dyn LayerTrait>> {
        self.layers()
            .into_iter()
            .filter(|l| l.is_visible(zoom))
            .collect()
    }

    /// Lists layer names in draw order
    pub fn names(&self) -> Vec<String> {
        self.layers().iter().map(|l| l.name().to_string()).collect()
    }

    /// Forwards a map movement to layers with widget-pinned geometries
    pub fn move_widget_geometries(&self, offset_px: &Point, zoom: i32) {
        for layer in self.layers() {
            layer.move_widget_geometries(offset_px, zoom);
        }
    }

    /// Gets the number of layers
    pub fn len(&self) -> usize {
        self.layers.read().map(|l| l.len()).unwrap_or(0)
    }

    /// Checks if the manager is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
