//! Region-of-interest subset files.
//!
//! The measurement tool that consumes crack outlines reads a nested
//! `begin`/`end` block format. The boundary is always the full image
//! rectangle; every detected crack becomes one polygon in the
//! `excluded` block so the tool skips it.
//!
//! ```text
//! # Crack detect output
//! begin region_of_interest
//!   begin boundary
//!     begin polygon
//!       begin vertices
//!         0 0
//!         ...
//!       end vertices
//!     end polygon
//!   end boundary
//!   begin excluded
//!     ...
//!   end excluded
//! end region_of_interest
//! ```
//!
//! [`to_roi`] is a pure function with no I/O: it returns a `String`.
//! [`parse_roi`] reads the same format back.

use std::fmt::Write;

use crack_detect_pipeline::{Dimensions, Point, Polygon};

/// Header comment written at the top of every subset file.
pub const HEADER: &str = "# Crack detect output";

const INDENT: &str = "  ";

/// The full image rectangle, in the vertex order the boundary block uses.
#[must_use]
pub fn boundary_polygon(dimensions: Dimensions) -> Polygon {
    let w = i32::try_from(dimensions.width).unwrap_or(i32::MAX);
    let h = i32::try_from(dimensions.height).unwrap_or(i32::MAX);
    Polygon::new(vec![
        Point::new(0, 0),
        Point::new(0, h),
        Point::new(w, h),
        Point::new(w, 0),
    ])
}

/// Serialize crack outlines into a region-of-interest subset file.
///
/// The boundary covers the whole `dimensions` rectangle and each entry
/// of `polygons` becomes one excluded polygon, in order.
///
/// # Examples
///
/// ```
/// use crack_detect_pipeline::{Dimensions, Point, Polygon};
/// use crack_detect_export::to_roi;
///
/// let crack = Polygon::new(vec![Point::new(3, 4), Point::new(9, 4), Point::new(9, 6)]);
/// let roi = to_roi(&[crack], Dimensions { width: 20, height: 10 });
/// assert!(roi.starts_with("# Crack detect output\n"));
/// assert!(roi.contains("        9 6\n"));
/// ```
#[must_use]
pub fn to_roi(polygons: &[Polygon], dimensions: Dimensions) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{HEADER}");
    let _ = writeln!(out, "begin region_of_interest");
    let _ = writeln!(out, "{INDENT}begin boundary");
    write_polygon(&mut out, &boundary_polygon(dimensions), 2);
    let _ = writeln!(out, "{INDENT}end boundary");
    let _ = writeln!(out, "{INDENT}begin excluded");
    for polygon in polygons {
        write_polygon(&mut out, polygon, 2);
    }
    let _ = writeln!(out, "{INDENT}end excluded");
    let _ = writeln!(out, "end region_of_interest");

    out
}

fn write_polygon(out: &mut String, polygon: &Polygon, depth: usize) {
    let pad = INDENT.repeat(depth);
    let _ = writeln!(out, "{pad}begin polygon");
    let _ = writeln!(out, "{pad}{INDENT}begin vertices");
    for p in polygon.points() {
        let _ = writeln!(out, "{pad}{INDENT}{INDENT}{} {}", p.x, p.y);
    }
    let _ = writeln!(out, "{pad}{INDENT}end vertices");
    let _ = writeln!(out, "{pad}end polygon");
}

/// A parsed subset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOfInterest {
    /// The region measured by the tool (the image rectangle for files
    /// written by [`to_roi`]).
    pub boundary: Polygon,
    /// Regions the tool skips, in file order.
    pub excluded: Vec<Polygon>,
}

/// Error parsing a subset file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct RoiParseError {
    /// 1-based line number where parsing failed.
    pub line: usize,
    /// What was wrong.
    pub reason: String,
}

impl RoiParseError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    RegionOfInterest,
    Boundary,
    Excluded,
    Polygon,
    Vertices,
}

impl Block {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "region_of_interest" => Some(Self::RegionOfInterest),
            "boundary" => Some(Self::Boundary),
            "excluded" => Some(Self::Excluded),
            "polygon" => Some(Self::Polygon),
            "vertices" => Some(Self::Vertices),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::RegionOfInterest => "region_of_interest",
            Self::Boundary => "boundary",
            Self::Excluded => "excluded",
            Self::Polygon => "polygon",
            Self::Vertices => "vertices",
        }
    }

    /// Whether `child` may open directly inside `parent` (`None` = top level).
    const fn allowed_in(child: Self, parent: Option<Self>) -> bool {
        matches!(
            (parent, child),
            (None, Self::RegionOfInterest)
                | (
                    Some(Self::RegionOfInterest),
                    Self::Boundary | Self::Excluded
                )
                | (Some(Self::Boundary | Self::Excluded), Self::Polygon)
                | (Some(Self::Polygon), Self::Vertices)
        )
    }
}

/// Parse a subset file.
///
/// Indentation is free-form. Blank lines and lines starting with `#`
/// are ignored. The boundary block must hold exactly one polygon; the
/// excluded block may hold any number, and may be omitted.
///
/// # Errors
///
/// Returns [`RoiParseError`] naming the offending line if a block is
/// unknown, misplaced or unbalanced, if a vertex line is not two
/// integers, or if the file has no complete region of interest.
pub fn parse_roi(input: &str) -> Result<RegionOfInterest, RoiParseError> {
    let mut stack: Vec<Block> = Vec::new();
    let mut vertices: Vec<Point> = Vec::new();
    let mut boundary: Vec<Polygon> = Vec::new();
    let mut excluded: Vec<Polygon> = Vec::new();
    let mut finished = false;
    let mut last_line = 0;

    for (index, raw) in input.lines().enumerate() {
        let line_no = index + 1;
        last_line = line_no;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if finished {
            return Err(RoiParseError::new(
                line_no,
                "content after end region_of_interest",
            ));
        }

        let mut words = line.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("begin"), Some(name), None) => {
                let block = Block::from_name(name).ok_or_else(|| {
                    RoiParseError::new(line_no, format!("unknown block `{name}`"))
                })?;
                if !Block::allowed_in(block, stack.last().copied()) {
                    let parent = stack.last().map_or("top level", |b| b.name());
                    return Err(RoiParseError::new(
                        line_no,
                        format!("`{name}` cannot appear in {parent}"),
                    ));
                }
                if block == Block::Vertices {
                    vertices.clear();
                }
                stack.push(block);
            }
            (Some("end"), Some(name), None) => {
                let open = stack.pop().ok_or_else(|| {
                    RoiParseError::new(line_no, format!("`end {name}` without matching begin"))
                })?;
                if open.name() != name {
                    return Err(RoiParseError::new(
                        line_no,
                        format!("expected `end {}`, found `end {name}`", open.name()),
                    ));
                }
                match (open, stack.last()) {
                    (Block::Polygon, Some(Block::Boundary)) => {
                        boundary.push(Polygon::new(std::mem::take(&mut vertices)));
                    }
                    (Block::Polygon, Some(Block::Excluded)) => {
                        excluded.push(Polygon::new(std::mem::take(&mut vertices)));
                    }
                    (Block::RegionOfInterest, None) => finished = true,
                    _ => {}
                }
            }
            (Some(x), Some(y), None) if stack.last() == Some(&Block::Vertices) => {
                let parse = |s: &str| {
                    s.parse::<i32>().map_err(|_| {
                        RoiParseError::new(line_no, format!("invalid coordinate `{s}`"))
                    })
                };
                vertices.push(Point::new(parse(x)?, parse(y)?));
            }
            _ => {
                return Err(RoiParseError::new(
                    line_no,
                    format!("unexpected line `{line}`"),
                ));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(RoiParseError::new(
            last_line + 1,
            format!("unterminated block `{}`", open.name()),
        ));
    }
    if !finished {
        return Err(RoiParseError::new(
            last_line + 1,
            "missing region_of_interest block",
        ));
    }

    let mut boundaries = boundary.into_iter();
    match (boundaries.next(), boundaries.next()) {
        (Some(boundary), None) => Ok(RegionOfInterest { boundary, excluded }),
        (None, _) => Err(RoiParseError::new(last_line, "boundary has no polygon")),
        (Some(_), Some(_)) => Err(RoiParseError::new(
            last_line,
            "boundary must hold exactly one polygon",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn poly(points: &[(i32, i32)]) -> Polygon {
        Polygon::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    const DIMS: Dimensions = Dimensions {
        width: 640,
        height: 480,
    };

    #[test]
    fn exact_layout() {
        let roi = to_roi(&[poly(&[(10, 20), (30, 20), (30, 25)])], DIMS);
        let expected = "\
# Crack detect output
begin region_of_interest
  begin boundary
    begin polygon
      begin vertices
        0 0
        0 480
        640 480
        640 0
      end vertices
    end polygon
  end boundary
  begin excluded
    begin polygon
      begin vertices
        10 20
        30 20
        30 25
      end vertices
    end polygon
  end excluded
end region_of_interest
";
        assert_eq!(roi, expected);
    }

    #[test]
    fn one_block_per_polygon() {
        let polygons = vec![
            poly(&[(1, 1), (2, 2), (3, 1)]),
            poly(&[(5, 5), (6, 6), (7, 5), (6, 4)]),
        ];
        let roi = to_roi(&polygons, DIMS);
        assert_eq!(roi.matches("begin polygon").count(), 3);
        assert_eq!(roi.matches("end vertices").count(), 3);
    }

    #[test]
    fn no_polygons_gives_empty_excluded_block() {
        let roi = to_roi(&[], DIMS);
        assert!(roi.contains("  begin excluded\n  end excluded\n"));
        let parsed = parse_roi(&roi).unwrap();
        assert!(parsed.excluded.is_empty());
    }

    #[test]
    fn round_trip_preserves_vertices() {
        let polygons = vec![
            poly(&[(12, 40), (80, 44), (150, 61), (148, 70), (11, 47)]),
            poly(&[(300, 300), (310, 305), (305, 320)]),
        ];
        let parsed = parse_roi(&to_roi(&polygons, DIMS)).unwrap();
        assert_eq!(parsed.excluded, polygons);
        assert_eq!(parsed.boundary, boundary_polygon(DIMS));
    }

    #[test]
    fn parser_ignores_indentation_comments_and_blank_lines() {
        let input = "\
# a comment

begin region_of_interest
begin boundary
\tbegin polygon
begin vertices
0 0
   0 10
10 10
        10 0
end vertices
end polygon
end boundary
# excluded regions follow
  begin excluded
    begin polygon
      begin vertices
        -1 2
      end vertices
    end polygon
  end excluded
end region_of_interest

";
        let parsed = parse_roi(input).unwrap();
        assert_eq!(parsed.boundary.len(), 4);
        assert_eq!(parsed.excluded, vec![poly(&[(-1, 2)])]);
    }

    #[test]
    fn excluded_block_is_optional() {
        let input = "begin region_of_interest\nbegin boundary\nbegin polygon\nbegin vertices\n0 0\nend vertices\nend polygon\nend boundary\nend region_of_interest\n";
        let parsed = parse_roi(input).unwrap();
        assert!(parsed.excluded.is_empty());
    }

    #[test]
    fn mismatched_end_reports_line() {
        let input = "begin region_of_interest\n  begin boundary\n  end excluded\n";
        let err = parse_roi(input).unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.reason.contains("end boundary"), "{err}");
    }

    #[test]
    fn bad_coordinate_reports_line() {
        let mut roi = to_roi(&[poly(&[(1, 2)])], DIMS);
        roi = roi.replace("        1 2\n", "        1 two\n");
        let err = parse_roi(&roi).unwrap_err();
        assert_eq!(err.line, 16);
        assert!(err.reason.contains("two"));
    }

    #[test]
    fn misplaced_block_is_rejected() {
        let err = parse_roi("begin polygon\n").unwrap_err();
        assert_eq!(err.line, 1);
        let err = parse_roi("begin region_of_interest\nbegin vertices\n").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn unterminated_and_empty_inputs_are_rejected() {
        assert!(parse_roi("").is_err());
        assert!(parse_roi("# only a comment\n").is_err());
        let err = parse_roi("begin region_of_interest\n").unwrap_err();
        assert!(err.reason.contains("unterminated"), "{err}");
    }

    #[test]
    fn boundary_needs_exactly_one_polygon() {
        let input = "begin region_of_interest\nbegin boundary\nend boundary\nend region_of_interest\n";
        assert!(parse_roi(input).is_err());
    }

    #[test]
    fn trailing_content_is_rejected() {
        let mut roi = to_roi(&[], DIMS);
        roi.push_str("begin boundary\n");
        assert!(parse_roi(&roi).is_err());
    }

    #[test]
    fn error_display_includes_line() {
        let err = RoiParseError::new(7, "bad");
        assert_eq!(err.to_string(), "line 7: bad");
    }
}
