//! Plain-data form of a [`RoadMap`], the shape maps are stored in on disk.
//!
//! Lanes are listed in id order; neighbour and successor references are
//! indices into the same list.

use gofi_core::{LaneId, Vec2};

use crate::{MapResult, RoadMap, RoadMapBuilder};

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneDescriptor {
    pub midline: Vec<Vec2>,
    pub width:   f64,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub left:    Option<u32>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub right:   Option<u32>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub successors: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapDescriptor {
    pub lanes: Vec<LaneDescriptor>,
}

impl MapDescriptor {
    /// Build the map.  Adjacency is taken from each lane's `right` link; a
    /// `left` link without the matching `right` on the other lane is added too.
    pub fn build(&self) -> MapResult<RoadMap> {
        let mut b = RoadMapBuilder::new();
        for lane in &self.lanes {
            b.add_lane(lane.midline.clone(), lane.width);
        }
        for (i, lane) in self.lanes.iter().enumerate() {
            let id = LaneId(i as u32);
            if let Some(r) = lane.right {
                b.link_adjacent(id, LaneId(r));
            }
            if let Some(l) = lane.left {
                let mirrored = self.lanes.get(l as usize).and_then(|o| o.right) == Some(i as u32);
                if !mirrored {
                    b.link_adjacent(LaneId(l), id);
                }
            }
            for &s in &lane.successors {
                b.add_successor(id, LaneId(s));
            }
        }
        b.build()
    }
}

impl From<&RoadMap> for MapDescriptor {
    fn from(map: &RoadMap) -> Self {
        let lanes = map
            .lanes()
            .iter()
            .map(|l| LaneDescriptor {
                midline:    l.midline.clone(),
                width:      l.width,
                left:       l.left.map(|id| id.0),
                right:      l.right.map(|id| id.0),
                successors: l.successors.iter().map(|id| id.0).collect(),
            })
            .collect();
        MapDescriptor { lanes }
    }
}
