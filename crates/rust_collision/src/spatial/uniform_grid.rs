//! Hashed uniform grid broad phase

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::geometry::AABB;
use crate::physics::{BodyHandle, CollisionPair};

use super::spatial_index::{into_sorted, overlapping_pairs_among, BroadPhase};

/// Integer cell coordinate
pub type CellCoord = (i32, i32, i32);

/// # Uniform Grid Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformGridConfig {
    /// Edge length of a cubic cell
    pub cell_size: f32,

    /// Bodies spanning more cells than this are tested against everyone
    /// instead of being rasterized
    pub max_cells_per_body: usize,
}

impl Default for UniformGridConfig {
    fn default() -> Self {
        Self {
            cell_size: 2.0,
            max_cells_per_body: 4096,
        }
    }
}

impl UniformGridConfig {
    /// Set the cell edge length
    #[must_use]
    pub const fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.cell_size = cell_size;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::Validation("grid.cell_size must be positive".into()));
        }
        if self.max_cells_per_body == 0 {
            return Err(ConfigError::Validation(
                "grid.max_cells_per_body must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where a body ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Empty box, stored but never paired
    Nowhere,
    /// Rasterized into the inclusive cell range
    Cells(CellCoord, CellCoord),
    /// Too large to rasterize
    Oversized,
}

/// Hashed uniform grid
#[derive(Debug, Clone)]
pub struct UniformGrid {
    config: UniformGridConfig,
    cells: HashMap<CellCoord, Vec<BodyHandle>>,
    entries: HashMap<BodyHandle, (AABB, Placement)>,
    oversized: Vec<BodyHandle>,
}

impl UniformGrid {
    /// Create an empty grid
    pub fn new(config: UniformGridConfig) -> Self {
        Self {
            config,
            cells: HashMap::new(),
            entries: HashMap::new(),
            oversized: Vec::new(),
        }
    }

    /// Cell containing `point`
    pub fn cell_of(&self, x: f32, y: f32, z: f32) -> CellCoord {
        let size = self.config.cell_size;
        (
            (x / size).floor() as i32,
            (y / size).floor() as i32,
            (z / size).floor() as i32,
        )
    }

    /// Number of non-empty cells
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Bodies too large to rasterize
    pub fn oversized_count(&self) -> usize {
        self.oversized.len()
    }

    fn placement_for(&self, aabb: &AABB) -> Placement {
        if !aabb.is_valid() {
            return Placement::Nowhere;
        }
        let lo = self.cell_of(aabb.min.x, aabb.min.y, aabb.min.z);
        let hi = self.cell_of(aabb.max.x, aabb.max.y, aabb.max.z);
        let span = |a: i32, b: i32| i64::from(b) - i64::from(a) + 1;
        let count = span(lo.0, hi.0)
            .saturating_mul(span(lo.1, hi.1))
            .saturating_mul(span(lo.2, hi.2));
        if count > self.config.max_cells_per_body as i64 {
            Placement::Oversized
        } else {
            Placement::Cells(lo, hi)
        }
    }

    fn place(&mut self, handle: BodyHandle, placement: Placement) {
        match placement {
            Placement::Nowhere => {}
            Placement::Oversized => self.oversized.push(handle),
            Placement::Cells(lo, hi) => {
                for x in lo.0..=hi.0 {
                    for y in lo.1..=hi.1 {
                        for z in lo.2..=hi.2 {
                            self.cells.entry((x, y, z)).or_default().push(handle);
                        }
                    }
                }
            }
        }
    }

    fn unplace(&mut self, handle: BodyHandle, placement: Placement) {
        match placement {
            Placement::Nowhere => {}
            Placement::Oversized => self.oversized.retain(|existing| *existing != handle),
            Placement::Cells(lo, hi) => {
                for x in lo.0..=hi.0 {
                    for y in lo.1..=hi.1 {
                        for z in lo.2..=hi.2 {
                            if let Some(members) = self.cells.get_mut(&(x, y, z)) {
                                members.retain(|existing| *existing != handle);
                                if members.is_empty() {
                                    self.cells.remove(&(x, y, z));
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

impl BroadPhase for UniformGrid {
    fn insert(&mut self, handle: BodyHandle, aabb: AABB) {
        let placement = self.placement_for(&aabb);
        if let Some((_, previous)) = self.entries.insert(handle, (aabb, placement)) {
            self.unplace(handle, previous);
        }
        self.place(handle, placement);
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        match self.entries.remove(&handle) {
            Some((_, placement)) => {
                self.unplace(handle, placement);
                true
            }
            None => false,
        }
    }

    fn rebuild(&mut self) {
        self.cells.clear();
        self.oversized.clear();

        let mut sorted: Vec<(BodyHandle, AABB)> =
            self.entries.iter().map(|(handle, (aabb, _))| (*handle, *aabb)).collect();
        sorted.sort_unstable_by_key(|(handle, _)| *handle);
        for (handle, aabb) in sorted {
            let placement = self.placement_for(&aabb);
            self.entries.insert(handle, (aabb, placement));
            self.place(handle, placement);
        }
    }

    fn query_pairs(&mut self) -> Vec<CollisionPair> {
        let mut pairs = HashSet::new();
        let mut members = Vec::new();

        for handles in self.cells.values() {
            if handles.len() < 2 {
                continue;
            }
            members.clear();
            members.extend(
                handles
                    .iter()
                    .filter_map(|handle| self.entries.get(handle).map(|(aabb, _)| (*handle, *aabb))),
            );
            overlapping_pairs_among(&members, &mut pairs);
        }

        for handle in &self.oversized {
            let Some((aabb, _)) = self.entries.get(handle) else {
                continue;
            };
            for (other, (other_aabb, _)) in &self.entries {
                if other != handle && aabb.intersects(other_aabb) {
                    pairs.insert(CollisionPair::new(*handle, *other));
                }
            }
        }

        into_sorted(pairs)
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
        self.oversized.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use slotmap::SlotMap;

    fn handles(count: usize) -> Vec<BodyHandle> {
        let mut map: SlotMap<BodyHandle, ()> = SlotMap::with_key();
        (0..count).map(|_| map.insert(())).collect()
    }

    fn unit_box(center: Vec3) -> AABB {
        AABB::from_center_half_extents(center, Vec3::repeat(0.5))
    }

    #[test]
    fn test_cell_coordinates_floor_negative_values() {
        let grid = UniformGrid::new(UniformGridConfig::default());
        assert_eq!(grid.cell_of(0.0, 1.99, 2.0), (0, 0, 1));
        assert_eq!(grid.cell_of(-0.01, -2.0, -2.01), (-1, -1, -2));
    }

    #[test]
    fn test_pairs_across_cell_boundary() {
        let ids = handles(3);
        let mut grid = UniformGrid::new(UniformGridConfig::default());
        grid.insert(ids[0], unit_box(Vec3::new(1.7, 0.0, 0.0)));
        grid.insert(ids[1], unit_box(Vec3::new(2.4, 0.0, 0.0)));
        grid.insert(ids[2], unit_box(Vec3::new(9.0, 0.0, 0.0)));
        assert_eq!(grid.query_pairs(), vec![CollisionPair::new(ids[0], ids[1])]);
    }

    #[test]
    fn test_same_cell_without_overlap_is_rejected() {
        let ids = handles(2);
        let config = UniformGridConfig::default().with_cell_size(10.0);
        let mut grid = UniformGrid::new(config);
        grid.insert(ids[0], unit_box(Vec3::new(1.0, 1.0, 1.0)));
        grid.insert(ids[1], unit_box(Vec3::new(8.0, 8.0, 8.0)));
        assert_eq!(grid.occupied_cells(), 1);
        assert!(grid.query_pairs().is_empty());
    }

    #[test]
    fn test_oversized_body_pairs_with_everyone_it_touches() {
        let ids = handles(3);
        let config = UniformGridConfig { cell_size: 1.0, max_cells_per_body: 8 };
        let mut grid = UniformGrid::new(config);
        grid.insert(ids[0], AABB::from_center_half_extents(Vec3::zeros(), Vec3::repeat(10.0)));
        grid.insert(ids[1], unit_box(Vec3::new(5.0, 5.0, 5.0)));
        grid.insert(ids[2], unit_box(Vec3::new(50.0, 0.0, 0.0)));

        assert_eq!(grid.oversized_count(), 1);
        assert_eq!(grid.query_pairs(), vec![CollisionPair::new(ids[0], ids[1])]);
    }

    #[test]
    fn test_update_and_remove_release_cells() {
        let ids = handles(2);
        let mut grid = UniformGrid::new(UniformGridConfig::default());
        grid.insert(ids[0], unit_box(Vec3::zeros()));
        grid.insert(ids[1], unit_box(Vec3::new(20.0, 0.0, 0.0)));
        assert!(grid.query_pairs().is_empty());

        grid.update(ids[1], unit_box(Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(grid.query_pairs().len(), 1);

        assert!(grid.remove(ids[0]));
        assert!(grid.remove(ids[1]));
        assert!(!grid.remove(ids[1]));
        assert_eq!(grid.occupied_cells(), 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_empty_box_occupies_nothing() {
        let ids = handles(1);
        let mut grid = UniformGrid::new(UniformGridConfig::default());
        grid.insert(ids[0], AABB::empty());
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.occupied_cells(), 0);
        assert_eq!(grid.oversized_count(), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(UniformGridConfig::default().validate().is_ok());
        assert!(UniformGridConfig::default().with_cell_size(0.0).validate().is_err());
        assert!(UniformGridConfig::default().with_cell_size(f32::NAN).validate().is_err());
    }
}
