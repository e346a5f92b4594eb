//! # Bricks
//!
//! The unit the World is built from. A brick is a box of grid cells
//! anchored at its minimum corner. Bricks live only inside the World's
//! registry; everything else refers to them by [`BrickId`].

use std::fmt;
use std::str::FromStr;

use bricklayer_shared::{Vec3f, Vec3i};
use serde::{Deserialize, Serialize};

/// Brick identity. `0` is reserved for "empty cell" in the grid.
pub type BrickId = u64;

/// Grid value meaning "no brick here".
pub const EMPTY_CELL: BrickId = 0;

/// Compass orientation of a brick.
///
/// Encoded on the wire as its discriminant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Facing +y
    #[default]
    North = 0,
    /// Facing +x
    East = 1,
    /// Facing -y
    South = 2,
    /// Facing -x
    West = 3,
}

impl Orientation {
    /// All orientations in wire order.
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Wire value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts from the wire value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::North),
            1 => Some(Self::East),
            2 => Some(Self::South),
            3 => Some(Self::West),
            _ => None,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "north",
            Self::East => "east",
            Self::South => "south",
            Self::West => "west",
        };
        f.write_str(name)
    }
}

impl FromStr for Orientation {
    type Err = String;

    /// Accepts the wire integer or a compass name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_u8(n).ok_or_else(|| s.to_string());
        }
        match s.to_ascii_lowercase().as_str() {
            "north" => Ok(Self::North),
            "east" => Ok(Self::East),
            "south" => Ok(Self::South),
            "west" => Ok(Self::West),
            _ => Err(s.to_string()),
        }
    }
}

/// The fixed set of brick colors offered to users and the voxelizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    /// (1, 0, 0)
    Red,
    /// (0, 1, 0)
    Green,
    /// (0, 0, 1)
    Blue,
    /// (1, 1, 0)
    Yellow,
    /// (1, 1, 1)
    White,
}

impl Palette {
    /// Every palette entry.
    pub const ALL: [Self; 5] = [Self::Red, Self::Green, Self::Blue, Self::Yellow, Self::White];

    /// RGB value of this entry.
    #[must_use]
    pub const fn rgb(self) -> Vec3f {
        match self {
            Self::Red => Vec3f::new(1.0, 0.0, 0.0),
            Self::Green => Vec3f::new(0.0, 1.0, 0.0),
            Self::Blue => Vec3f::new(0.0, 0.0, 1.0),
            Self::Yellow => Vec3f::new(1.0, 1.0, 0.0),
            Self::White => Vec3f::new(1.0, 1.0, 1.0),
        }
    }
}

impl From<Palette> for Vec3f {
    fn from(p: Palette) -> Self {
        p.rgb()
    }
}

/// A placed brick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brick {
    id: BrickId,
    /// Grid cell of the minimum corner.
    pub position: Vec3i,
    /// Extent in cells, all components > 0.
    pub size: Vec3i,
    /// Compass orientation.
    pub orientation: Orientation,
    /// RGB color.
    pub color: Vec3f,
}

impl Brick {
    /// Creates a brick record. Only the World hands out ids.
    #[must_use]
    pub(crate) const fn new(
        id: BrickId,
        position: Vec3i,
        size: Vec3i,
        orientation: Orientation,
        color: Vec3f,
    ) -> Self {
        Self { id, position, size, orientation, color }
    }

    /// Brick id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> BrickId {
        self.id
    }

    /// Exclusive upper corner of the footprint.
    #[inline]
    #[must_use]
    pub fn max_corner(&self) -> Vec3i {
        Vec3i::new(
            self.position.x.saturating_add(self.size.x),
            self.position.y.saturating_add(self.size.y),
            self.position.z.saturating_add(self.size.z),
        )
    }

    /// True if `cell` lies within the footprint.
    #[must_use]
    pub fn covers(&self, cell: Vec3i) -> bool {
        let max = self.max_corner();
        (0..3).all(|axis| cell[axis] >= self.position[axis] && cell[axis] < max[axis])
    }

    /// Iterates the cells of a footprint in x-fastest order.
    pub fn footprint(position: Vec3i, size: Vec3i) -> impl Iterator<Item = Vec3i> {
        (0..size.z.max(0)).flat_map(move |dz| {
            (0..size.y.max(0)).flat_map(move |dy| {
                (0..size.x.max(0)).map(move |dx| position + Vec3i::new(dx, dy, dz))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_wire_values() {
        for o in Orientation::ALL {
            assert_eq!(Orientation::from_u8(o.as_u8()), Some(o));
        }
        assert_eq!(Orientation::East.as_u8(), 1);
        assert_eq!(Orientation::from_u8(4), None);
    }

    #[test]
    fn test_orientation_from_str() {
        assert_eq!("2".parse::<Orientation>(), Ok(Orientation::South));
        assert_eq!("West".parse::<Orientation>(), Ok(Orientation::West));
        assert!("up".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_footprint_cells() {
        let cells: Vec<_> = Brick::footprint(Vec3i::ZERO, Vec3i::new(2, 2, 1)).collect();
        assert_eq!(
            cells,
            vec![
                Vec3i::new(0, 0, 0),
                Vec3i::new(1, 0, 0),
                Vec3i::new(0, 1, 0),
                Vec3i::new(1, 1, 0),
            ]
        );
    }

    #[test]
    fn test_covers() {
        let brick = Brick::new(
            1,
            Vec3i::new(-2, 0, 3),
            Vec3i::new(2, 1, 1),
            Orientation::North,
            Palette::Red.rgb(),
        );
        assert!(brick.covers(Vec3i::new(-1, 0, 3)));
        assert!(!brick.covers(Vec3i::new(0, 0, 3)));
        assert!(!brick.covers(Vec3i::new(-2, 0, 4)));
    }
}
