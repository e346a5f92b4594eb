//! Operations: the closed set of brick mutations and their one-line codec.
//!
//! ```text
//! CreateBrick <px> <py> <pz> <sx> <sy> <sz> <orient> <r> <g> <b>
//! ModifyBrickPosition <id> <px> <py> <pz>
//! ModifyBrickSize <id> <sx> <sy> <sz>
//! ModifyBrickOrientation <id> <orient>
//! ModifyBrickColor <id> <r> <g> <b>
//! DeleteBrick <id>
//! ```

use std::fmt;
use std::str::{FromStr, SplitWhitespace};

use bricklayer_shared::{Vec3f, Vec3i};

use crate::brick::{BrickId, Orientation};
use crate::error::ParseError;

/// One atomic intended mutation of the World.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operation {
    /// Place a new brick. The World assigns its id on application.
    CreateBrick {
        /// Minimum corner cell.
        position: Vec3i,
        /// Extent in cells.
        size: Vec3i,
        /// Compass orientation.
        orientation: Orientation,
        /// RGB color.
        color: Vec3f,
    },
    /// Move an existing brick.
    ModifyBrickPosition {
        /// Target brick.
        brick_id: BrickId,
        /// New minimum corner.
        position: Vec3i,
    },
    /// Resize an existing brick in place.
    ModifyBrickSize {
        /// Target brick.
        brick_id: BrickId,
        /// New extent.
        size: Vec3i,
    },
    /// Rotate an existing brick.
    ModifyBrickOrientation {
        /// Target brick.
        brick_id: BrickId,
        /// New orientation.
        orientation: Orientation,
    },
    /// Recolor an existing brick.
    ModifyBrickColor {
        /// Target brick.
        brick_id: BrickId,
        /// New color.
        color: Vec3f,
    },
    /// Remove a brick.
    DeleteBrick {
        /// Target brick.
        brick_id: BrickId,
    },
}

impl Operation {
    /// Wire keyword for this variant.
    #[must_use]
    pub const fn keyword(&self) -> &'static str {
        match self {
            Self::CreateBrick { .. } => "CreateBrick",
            Self::ModifyBrickPosition { .. } => "ModifyBrickPosition",
            Self::ModifyBrickSize { .. } => "ModifyBrickSize",
            Self::ModifyBrickOrientation { .. } => "ModifyBrickOrientation",
            Self::ModifyBrickColor { .. } => "ModifyBrickColor",
            Self::DeleteBrick { .. } => "DeleteBrick",
        }
    }

    /// The brick this op refers to, or `None` for a create.
    #[must_use]
    pub const fn brick_id(&self) -> Option<BrickId> {
        match self {
            Self::CreateBrick { .. } => None,
            Self::ModifyBrickPosition { brick_id, .. }
            | Self::ModifyBrickSize { brick_id, .. }
            | Self::ModifyBrickOrientation { brick_id, .. }
            | Self::ModifyBrickColor { brick_id, .. }
            | Self::DeleteBrick { brick_id } => Some(*brick_id),
        }
    }

    /// True for ops that can change which cells are occupied.
    #[must_use]
    pub const fn affects_placement(&self) -> bool {
        matches!(
            self,
            Self::CreateBrick { .. } | Self::ModifyBrickPosition { .. } | Self::ModifyBrickSize { .. }
        )
    }

    /// Serializes to one newline-terminated line.
    #[must_use]
    pub fn serialize(&self) -> String {
        format!("{self}\n")
    }

    /// Parses one op line (trailing newline optional).
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming the first field that failed.
    pub fn deserialize(line: &str) -> Result<Self, ParseError> {
        let mut fields = Fields::new(line);
        let keyword = fields.tokens.next().ok_or(ParseError::Empty)?;

        let op = match keyword {
            "CreateBrick" => {
                fields.keyword = "CreateBrick";
                Self::CreateBrick {
                    position: fields.vec3i("position")?,
                    size: fields.vec3i("size")?,
                    orientation: fields.orientation()?,
                    color: fields.vec3f("color")?,
                }
            }
            "ModifyBrickPosition" => {
                fields.keyword = "ModifyBrickPosition";
                Self::ModifyBrickPosition {
                    brick_id: fields.brick_id()?,
                    position: fields.vec3i("position")?,
                }
            }
            "ModifyBrickSize" => {
                fields.keyword = "ModifyBrickSize";
                Self::ModifyBrickSize { brick_id: fields.brick_id()?, size: fields.vec3i("size")? }
            }
            "ModifyBrickOrientation" => {
                fields.keyword = "ModifyBrickOrientation";
                Self::ModifyBrickOrientation {
                    brick_id: fields.brick_id()?,
                    orientation: fields.orientation()?,
                }
            }
            "ModifyBrickColor" => {
                fields.keyword = "ModifyBrickColor";
                Self::ModifyBrickColor {
                    brick_id: fields.brick_id()?,
                    color: fields.vec3f("color")?,
                }
            }
            "DeleteBrick" => {
                fields.keyword = "DeleteBrick";
                Self::DeleteBrick { brick_id: fields.brick_id()? }
            }
            other => return Err(ParseError::UnknownKeyword(other.to_string())),
        };

        fields.finish()?;
        Ok(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())?;
        match self {
            Self::CreateBrick { position: p, size: s, orientation, color: c } => write!(
                f,
                " {} {} {} {} {} {} {} {} {} {}",
                p.x,
                p.y,
                p.z,
                s.x,
                s.y,
                s.z,
                orientation.as_u8(),
                c.x,
                c.y,
                c.z
            ),
            Self::ModifyBrickPosition { brick_id, position: p } => {
                write!(f, " {brick_id} {} {} {}", p.x, p.y, p.z)
            }
            Self::ModifyBrickSize { brick_id, size: s } => {
                write!(f, " {brick_id} {} {} {}", s.x, s.y, s.z)
            }
            Self::ModifyBrickOrientation { brick_id, orientation } => {
                write!(f, " {brick_id} {}", orientation.as_u8())
            }
            Self::ModifyBrickColor { brick_id, color: c } => {
                write!(f, " {brick_id} {} {} {}", c.x, c.y, c.z)
            }
            Self::DeleteBrick { brick_id } => write!(f, " {brick_id}"),
        }
    }
}

impl FromStr for Operation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::deserialize(s)
    }
}

/// Typed field reader over the whitespace tokens of one line.
struct Fields<'a> {
    tokens: SplitWhitespace<'a>,
    keyword: &'static str,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self { tokens: line.split_whitespace(), keyword: "" }
    }

    fn next<T: FromStr>(&mut self, field: &'static str) -> Result<T, ParseError> {
        let keyword = self.keyword;
        let token = self.tokens.next().ok_or(ParseError::MissingField { keyword, field })?;
        token.parse().map_err(|_| ParseError::BadField {
            keyword,
            field,
            value: token.to_string(),
        })
    }

    fn brick_id(&mut self) -> Result<BrickId, ParseError> {
        self.next("id")
    }

    fn vec3i(&mut self, field: &'static str) -> Result<Vec3i, ParseError> {
        Ok(Vec3i::new(self.next(field)?, self.next(field)?, self.next(field)?))
    }

    fn vec3f(&mut self, field: &'static str) -> Result<Vec3f, ParseError> {
        Ok(Vec3f::new(self.next(field)?, self.next(field)?, self.next(field)?))
    }

    fn orientation(&mut self) -> Result<Orientation, ParseError> {
        self.next("orientation")
    }

    fn finish(mut self) -> Result<(), ParseError> {
        match self.tokens.next() {
            None => Ok(()),
            Some(token) => Err(ParseError::TrailingToken {
                keyword: self.keyword,
                token: token.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::Palette;

    fn samples() -> Vec<Operation> {
        vec![
            Operation::CreateBrick {
                position: Vec3i::new(-31, -5, 0),
                size: Vec3i::new(2, 2, 1),
                orientation: Orientation::East,
                color: Vec3f::new(0.25, 0.1, 1.0),
            },
            Operation::ModifyBrickPosition { brick_id: 7, position: Vec3i::new(-1, 0, 62) },
            Operation::ModifyBrickSize { brick_id: 3, size: Vec3i::new(4, 1, 3) },
            Operation::ModifyBrickOrientation { brick_id: 9, orientation: Orientation::West },
            Operation::ModifyBrickColor { brick_id: 12, color: Palette::Yellow.rgb() },
            Operation::DeleteBrick { brick_id: u64::MAX },
        ]
    }

    #[test]
    fn test_every_variant_survives_the_wire() {
        for op in samples() {
            let line = op.serialize();
            assert!(line.ends_with('\n'));
            assert_eq!(Operation::deserialize(&line), Ok(op), "line: {line}");
        }
    }

    #[test]
    fn test_create_brick_line_layout() {
        let op = Operation::CreateBrick {
            position: Vec3i::new(0, -1, 2),
            size: Vec3i::new(2, 2, 1),
            orientation: Orientation::East,
            color: Palette::Red.rgb(),
        };
        assert_eq!(op.to_string(), "CreateBrick 0 -1 2 2 2 1 1 1 0 0");
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(
            Operation::deserialize("PaintWorld 1 2 3"),
            Err(ParseError::UnknownKeyword("PaintWorld".into()))
        );
        assert_eq!(Operation::deserialize("   \n"), Err(ParseError::Empty));
    }

    #[test]
    fn test_malformed_fields() {
        assert!(matches!(
            Operation::deserialize("DeleteBrick"),
            Err(ParseError::MissingField { keyword: "DeleteBrick", field: "id" })
        ));
        assert!(matches!(
            Operation::deserialize("ModifyBrickSize 1 2 x 3"),
            Err(ParseError::BadField { field: "size", .. })
        ));
        assert!(matches!(
            Operation::deserialize("ModifyBrickOrientation 1 9"),
            Err(ParseError::BadField { field: "orientation", .. })
        ));
        assert!(matches!(
            Operation::deserialize("DeleteBrick 4 5"),
            Err(ParseError::TrailingToken { .. })
        ));
    }

    #[test]
    fn test_brick_id_and_placement() {
        let ops = samples();
        assert_eq!(ops[0].brick_id(), None);
        assert_eq!(ops[1].brick_id(), Some(7));
        assert!(ops[0].affects_placement());
        assert!(ops[2].affects_placement());
        assert!(!ops[4].affects_placement());
    }
}
