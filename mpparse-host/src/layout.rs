//! Image auto-layout. Hosts report natural image sizes only after load, so
//! sizing lives here, apart from the cached tree, and is re-read on every render.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

/// Scale an image down to `viewport_width` preserving aspect ratio; smaller images pass through.
pub fn compute_display_size(
    natural_width: f64,
    natural_height: f64,
    viewport_width: f64,
) -> DisplaySize {
    if natural_width > viewport_width {
        let height = if natural_width > 0.0 {
            natural_height * viewport_width / natural_width
        } else {
            0.0
        };
        DisplaySize {
            width: viewport_width,
            height,
        }
    } else {
        DisplaySize {
            width: natural_width,
            height: natural_height,
        }
    }
}

/// Width images may occupy: a share of the viewport minus the instance's padding on both sides.
pub fn available_width(viewport: &Viewport, max_width_ratio: f64, view_padding: f64) -> f64 {
    (viewport.width * max_width_ratio - 2.0 * view_padding).max(0.0)
}

/// Auto-computed sizes keyed by image index within one instance.
#[derive(Debug, Clone, Default)]
pub struct ImageSizing {
    sizes: HashMap<usize, DisplaySize>,
}

impl ImageSizing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a size. Returns true when it differs from what was stored.
    pub fn record(&mut self, index: usize, size: DisplaySize) -> bool {
        self.sizes.insert(index, size) != Some(size)
    }

    pub fn get(&self, index: usize) -> Option<DisplaySize> {
        self.sizes.get(&index).copied()
    }

    pub fn clear(&mut self) {
        self.sizes.clear();
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}
