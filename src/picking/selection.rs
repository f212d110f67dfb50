//! Per-category selection results and cross-category filtering

use crate::model::Structure;
use crate::rasterizer::Vec3;

use super::encoder::PickIndices;

/// Kinds of pickable geometry, one result slot each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionCategory {
    SurfaceNode,
    SurfaceTriangle,
    Border,
    Focus,
    Voxel,
    MediaPixel,
    ControlPoint,
    ChartData,
    Annotation,
}

impl SelectionCategory {
    pub const ALL: [SelectionCategory; 9] = [
        SelectionCategory::SurfaceNode,
        SelectionCategory::SurfaceTriangle,
        SelectionCategory::Border,
        SelectionCategory::Focus,
        SelectionCategory::Voxel,
        SelectionCategory::MediaPixel,
        SelectionCategory::ControlPoint,
        SelectionCategory::ChartData,
        SelectionCategory::Annotation,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Node and triangle depths closer than this are treated as the same hit
const NODE_TRIANGLE_DEPTH_TOLERANCE: f32 = 0.00001;

/// Borders and foci sit on the surface; nudging them forward lets them win
/// against the triangles they are drawn on
const LAYERED_DEPTH_FACTOR: f32 = 0.99;

/// Triangle vertex closest to the mouse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestVertex {
    pub index: usize,
    pub screen_xyz: Vec3,
    pub model_xyz: Vec3,
}

/// A decoded pick plus where it happened
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub category: SelectionCategory,
    pub indices: PickIndices,
    pub screen_depth: f32,
    pub screen_xyz: Option<Vec3>,
    pub model_xyz: Option<Vec3>,
    pub nearest_vertex: Option<NearestVertex>,
    pub structure: Option<Structure>,
    pub window_index: usize,
    pub tab_index: Option<usize>,
}

impl SelectionResult {
    pub fn new(category: SelectionCategory, indices: PickIndices, screen_depth: f32) -> Self {
        Self {
            category,
            indices,
            screen_depth,
            screen_xyz: None,
            model_xyz: None,
            nearest_vertex: None,
            structure: None,
            window_index: 0,
            tab_index: None,
        }
    }
}

/// Holds at most one result per category, nearest wins
#[derive(Debug, Clone)]
pub struct SelectionManager {
    slots: [Option<SelectionResult>; 9],
    enabled: [bool; 9],
}

impl Default for SelectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionManager {
    pub fn new() -> Self {
        Self {
            slots: Default::default(),
            enabled: [true; 9],
        }
    }

    /// Clear all results, keep enable flags
    pub fn reset(&mut self) {
        self.slots = Default::default();
    }

    pub fn set_enabled(&mut self, category: SelectionCategory, enabled: bool) {
        self.enabled[category.slot()] = enabled;
    }

    pub fn is_enabled(&self, category: SelectionCategory) -> bool {
        self.enabled[category.slot()]
    }

    pub fn result(&self, category: SelectionCategory) -> Option<&SelectionResult> {
        self.slots[category.slot()].as_ref()
    }

    pub fn clear(&mut self, category: SelectionCategory) {
        self.slots[category.slot()] = None;
    }

    /// True if a candidate at `depth` would replace the stored result
    pub fn is_closer(&self, category: SelectionCategory, depth: f32) -> bool {
        match &self.slots[category.slot()] {
            Some(existing) => depth < existing.screen_depth,
            None => true,
        }
    }

    /// Store `candidate` if it is strictly nearer than the current result
    pub fn offer(&mut self, candidate: SelectionResult) -> bool {
        if !self.is_closer(candidate.category, candidate.screen_depth) {
            return false;
        }
        let slot = candidate.category.slot();
        self.slots[slot] = Some(candidate);
        true
    }

    pub fn any_selected(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Clean up after all passes of one pick
    pub fn filter_selections(&mut self, apply_occlusion_filter: bool) {
        if let Some(tri) = self.result(SelectionCategory::SurfaceTriangle).cloned() {
            if let Some(nd) = self.result(SelectionCategory::SurfaceNode).map(|r| r.screen_depth) {
                if nd - tri.screen_depth > NODE_TRIANGLE_DEPTH_TOLERANCE {
                    self.clear(SelectionCategory::SurfaceNode);
                }
            }

            // no node (or a dropped one): use the triangle's nearest vertex
            if self.result(SelectionCategory::SurfaceNode).is_none() {
                if let Some(nearest) = tri.nearest_vertex {
                    log::trace!("using nearest vertex {} of the picked triangle", nearest.index);
                    let mut node = SelectionResult::new(
                        SelectionCategory::SurfaceNode,
                        PickIndices::one(nearest.index),
                        tri.screen_depth,
                    );
                    node.screen_xyz = Some(nearest.screen_xyz);
                    node.model_xyz = Some(nearest.model_xyz);
                    node.structure = tri.structure;
                    node.window_index = tri.window_index;
                    node.tab_index = tri.tab_index;
                    self.offer(node);
                }
            }
        }

        if apply_occlusion_filter {
            self.clear_distant_selections();
        }
    }

    /// Keep only the nearest of the layered / surface / volume groups.
    /// Border and focus depths are scaled in place so they win against the
    /// surface they lie on.
    fn clear_distant_selections(&mut self) {
        for c in [SelectionCategory::Border, SelectionCategory::Focus] {
            if let Some(r) = self.slots[c.slot()].as_mut() {
                r.screen_depth *= LAYERED_DEPTH_FACTOR;
            }
        }

        let groups: [&[SelectionCategory]; 3] = [
            &[SelectionCategory::Border, SelectionCategory::Focus],
            &[SelectionCategory::SurfaceNode, SelectionCategory::SurfaceTriangle],
            &[SelectionCategory::Voxel],
        ];

        let depths: Vec<Option<f32>> = groups
            .iter()
            .map(|cats| {
                cats.iter()
                    .filter_map(|c| self.result(*c).map(|r| r.screen_depth))
                    .reduce(f32::min)
            })
            .collect();

        let mut nearest: Option<(usize, f32)> = None;
        for (i, d) in depths.iter().enumerate() {
            if let Some(d) = d {
                if nearest.map_or(true, |(_, best)| *d < best) {
                    nearest = Some((i, *d));
                }
            }
        }

        let Some((keep, _)) = nearest else {
            return;
        };
        for (i, cats) in groups.iter().enumerate() {
            if i != keep {
                for c in cats.iter() {
                    self.clear(*c);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(category: SelectionCategory, index: usize, depth: f32) -> SelectionResult {
        SelectionResult::new(category, PickIndices::one(index), depth)
    }

    #[test]
    fn test_nearer_wins_in_either_order() {
        let (a, b, c) = (0.2, 0.6, 0.4);
        for order in [[a, b], [b, a]] {
            let mut mgr = SelectionManager::new();
            for d in order {
                mgr.offer(candidate(SelectionCategory::Voxel, (d * 10.0) as usize, d));
            }
            assert_eq!(mgr.result(SelectionCategory::Voxel).unwrap().screen_depth, a);
            assert!(!mgr.offer(candidate(SelectionCategory::Voxel, 99, c)));
            assert_eq!(mgr.result(SelectionCategory::Voxel).unwrap().screen_depth, a);
        }
    }

    #[test]
    fn test_equal_depth_does_not_replace() {
        let mut mgr = SelectionManager::new();
        assert!(mgr.offer(candidate(SelectionCategory::Border, 1, 0.5)));
        assert!(!mgr.offer(candidate(SelectionCategory::Border, 2, 0.5)));
        assert_eq!(mgr.result(SelectionCategory::Border).unwrap().indices.first, 1);
    }

    #[test]
    fn test_node_behind_triangle_is_dropped() {
        let mut mgr = SelectionManager::new();
        mgr.offer(candidate(SelectionCategory::SurfaceNode, 5, 0.6));
        mgr.offer(candidate(SelectionCategory::SurfaceTriangle, 7, 0.3));
        mgr.filter_selections(false);
        assert!(mgr.result(SelectionCategory::SurfaceNode).is_none());
        assert!(mgr.result(SelectionCategory::SurfaceTriangle).is_some());
    }

    #[test]
    fn test_dropped_node_is_rebuilt_from_triangle() {
        let mut mgr = SelectionManager::new();
        mgr.offer(candidate(SelectionCategory::SurfaceNode, 5, 0.6));
        let mut tri = candidate(SelectionCategory::SurfaceTriangle, 7, 0.3);
        tri.nearest_vertex = Some(NearestVertex {
            index: 42,
            screen_xyz: Vec3::new(10.0, 11.0, 0.3),
            model_xyz: Vec3::new(1.0, 2.0, 3.0),
        });
        mgr.offer(tri);
        mgr.filter_selections(false);
        let node = mgr.result(SelectionCategory::SurfaceNode).unwrap();
        assert_eq!(node.indices.first, 42);
        assert_eq!(node.screen_depth, 0.3);
    }

    #[test]
    fn test_triangle_supplies_missing_node() {
        let mut mgr = SelectionManager::new();
        let mut tri = candidate(SelectionCategory::SurfaceTriangle, 7, 0.3);
        tri.nearest_vertex = Some(NearestVertex {
            index: 42,
            screen_xyz: Vec3::new(10.0, 11.0, 0.3),
            model_xyz: Vec3::new(1.0, 2.0, 3.0),
        });
        mgr.offer(tri);
        mgr.filter_selections(false);
        let node = mgr.result(SelectionCategory::SurfaceNode).unwrap();
        assert_eq!(node.indices.first, 42);
        assert_eq!(node.screen_depth, 0.3);
        assert_eq!(node.model_xyz, Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_occlusion_filter_keeps_nearest_group() {
        let mut mgr = SelectionManager::new();
        mgr.offer(candidate(SelectionCategory::SurfaceTriangle, 1, 0.5));
        mgr.offer(candidate(SelectionCategory::Voxel, 2, 0.3));
        mgr.offer(candidate(SelectionCategory::Focus, 3, 0.45));
        mgr.filter_selections(true);
        assert!(mgr.result(SelectionCategory::Voxel).is_some());
        assert!(mgr.result(SelectionCategory::SurfaceTriangle).is_none());
        assert!(mgr.result(SelectionCategory::SurfaceNode).is_none());
        assert!(mgr.result(SelectionCategory::Focus).is_none());
    }

    #[test]
    fn test_layered_features_win_on_their_surface() {
        let mut mgr = SelectionManager::new();
        mgr.offer(candidate(SelectionCategory::SurfaceTriangle, 1, 0.5));
        mgr.offer(candidate(SelectionCategory::Border, 2, 0.5));
        mgr.filter_selections(true);
        let border = mgr.result(SelectionCategory::Border).unwrap();
        assert!((border.screen_depth - 0.495).abs() < 1e-6);
        assert!(mgr.result(SelectionCategory::SurfaceTriangle).is_none());
    }

    #[test]
    fn test_filter_disabled_keeps_all_groups() {
        let mut mgr = SelectionManager::new();
        mgr.offer(candidate(SelectionCategory::SurfaceTriangle, 1, 0.5));
        mgr.offer(candidate(SelectionCategory::Voxel, 2, 0.3));
        mgr.filter_selections(false);
        assert!(mgr.result(SelectionCategory::Voxel).is_some());
        assert!(mgr.result(SelectionCategory::SurfaceTriangle).is_some());
    }
}
