//! Drawing strategies and the catalog that selects between them.

use std::fmt;

use crate::{
    config::{Configuration, Experiments, Rgb},
    graph::{ConnectionGraph, ConnectionTopology, Edge},
    landmarks::{Landmark, LandmarkSet},
    render::Canvas,
};

mod dots;
mod mesh;
mod skeleton;
mod wireframe;

pub use dots::Dots;
pub use mesh::Mesh;
pub use skeleton::Skeleton;
pub use wireframe::{WireframeHexagon, WireframeTriangle};

/// Identifier of a drawing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeId {
    Mesh,
    Dots,
    Skeleton,
    WireframeTriangle,
    WireframeHexagon,
}

impl ModeId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Mesh => "Mesh",
            Self::Dots => "Dots",
            Self::Skeleton => "Skeleton",
            Self::WireframeTriangle => "Wireframe Triangle",
            Self::WireframeHexagon => "Wireframe Hexagon",
        }
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const BASE_CATALOG: [ModeId; 2] = [ModeId::Mesh, ModeId::Dots];
const EXTENDED_CATALOG: [ModeId; 5] = [
    ModeId::Mesh,
    ModeId::Dots,
    ModeId::Skeleton,
    ModeId::WireframeTriangle,
    ModeId::WireframeHexagon,
];

/// Ordered mode catalog for the given experiment flags.
pub fn resolve_catalog(experiments: &Experiments) -> &'static [ModeId] {
    if experiments.additional_modes {
        &EXTENDED_CATALOG
    } else {
        &BASE_CATALOG
    }
}

/// Keeps `old` when it still addresses `catalog`, otherwise resets to 0.
pub fn clamp_index(old: usize, catalog: &[ModeId]) -> usize {
    if old < catalog.len() {
        old
    } else {
        0
    }
}

/// Effective drawing parameters for one frame. Built fresh every frame from
/// the configuration plus any per-frame overrides; never written back.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameParams {
    pub width: u32,
    pub height: u32,
    pub dot_color: Rgb,
    pub line_color: Rgb,
    pub dot_size: u32,
    pub line_thickness: u32,
    pub topology: ConnectionTopology,
    pub show_hands: bool,
    pub hexagon_radius: u32,
}

impl FrameParams {
    pub fn from_config(config: &Configuration, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            dot_color: config.effective_dot_color(),
            line_color: config.effective_line_color(),
            dot_size: config.dot_size,
            line_thickness: config.line_thickness,
            topology: config.connection_topology,
            show_hands: config.show_hands,
            hexagon_radius: config.hexagon_radius,
        }
    }

    /// Hand sets to draw: none when hands are hidden.
    pub fn visible_hands<'a>(&self, hands: &'a [LandmarkSet]) -> &'a [LandmarkSet] {
        if self.show_hands {
            hands
        } else {
            &[]
        }
    }

    fn dot(&self, canvas: &mut dyn Canvas, landmark: Landmark, radius: u32) {
        canvas.circle(landmark.to_pixel(self.width, self.height), radius, self.dot_color);
    }

    fn edge(&self, canvas: &mut dyn Canvas, set: &LandmarkSet, edge: Edge) {
        if let Some((start, end)) = set.edge(edge) {
            canvas.line(
                start.to_pixel(self.width, self.height),
                end.to_pixel(self.width, self.height),
                self.line_color,
                self.line_thickness,
            );
        }
    }

    fn dots_at(&self, canvas: &mut dyn Canvas, set: &LandmarkSet, indices: &[usize]) {
        for landmark in indices.iter().filter_map(|&index| set.get(index)) {
            self.dot(canvas, landmark, self.dot_size);
        }
    }
}

/// A visualization variant.
pub trait DrawStrategy: Send + Sync {
    fn id(&self) -> ModeId;

    /// Draws one face and, when visible, every detected hand.
    fn draw(
        &self,
        face: &LandmarkSet,
        hands: &[LandmarkSet],
        graph: &ConnectionGraph,
        params: &FrameParams,
        canvas: &mut dyn Canvas,
    );
}

/// Catalog of every drawing strategy, in catalog order.
pub struct ModeRegistry {
    strategies: Vec<Box<dyn DrawStrategy>>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(Mesh),
                Box::new(Dots),
                Box::new(Skeleton),
                Box::new(WireframeTriangle),
                Box::new(WireframeHexagon),
            ],
        }
    }

    /// Names of the modes available under the given flags.
    pub fn names(experiments: &Experiments) -> Vec<&'static str> {
        resolve_catalog(experiments).iter().map(|id| id.name()).collect()
    }

    /// Strategy for the configuration's current mode.
    ///
    /// # Panics
    ///
    /// Panics when `mode` does not address the active catalog. Every
    /// [`Configuration`] mutation re-validates the index, so this indicates a
    /// bug rather than bad input.
    pub fn resolve(&self, config: &Configuration) -> &dyn DrawStrategy {
        let id = *config
            .modes()
            .get(config.mode)
            .expect("mode index is validated against the active catalog");
        self.strategy(id)
    }

    pub fn strategy(&self, id: ModeId) -> &dyn DrawStrategy {
        self.strategies
            .iter()
            .find(|strategy| strategy.id() == id)
            .map(|strategy| strategy.as_ref())
            .expect("every mode id has a registered strategy")
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.strategies.iter().map(|strategy| strategy.id()))
            .finish()
    }
}
