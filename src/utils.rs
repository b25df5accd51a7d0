use crate::engine::{Color, SegmentIds, Tube};
use crate::error::{Error, Result};

/// Parses one tube from a string of color letters, bottom first.
///
/// `""`, `"-"` and `"."` all denote an empty tube. Segment ids start at 0.
///
/// # Examples
/// ```
/// use tube_sort_solver::engine::Color;
/// use tube_sort_solver::utils::tube_from_str;
///
/// let tube = tube_from_str(0, 4, "RBB").unwrap();
/// assert_eq!(tube.colors(), vec![Color::RED, Color::BLUE, Color::BLUE]);
/// assert!(tube_from_str(0, 2, "RBB").is_err());
/// assert!(tube_from_str(0, 4, "RX").is_err());
/// ```
pub fn tube_from_str(id: usize, capacity: usize, s: &str) -> Result<Tube> {
    parse_tube(id, capacity, s, &mut SegmentIds::new())
}

/// Parses a row of tube strings into a collection with ids `0..n`.
///
/// Every tube gets the same `capacity`; segment ids are unique across the
/// whole collection.
///
/// # Errors
/// Returns `Error::Parse` for an unrecognized letter and `Error::Overfilled`
/// when a row is longer than `capacity`.
pub fn tubes_from_str_array(capacity: usize, rows: &[&str]) -> Result<Vec<Tube>> {
    let mut ids = SegmentIds::new();
    rows.iter()
        .enumerate()
        .map(|(id, row)| parse_tube(id, capacity, row, &mut ids))
        .collect()
}

fn parse_tube(id: usize, capacity: usize, s: &str, ids: &mut SegmentIds) -> Result<Tube> {
    let s = s.trim();
    if s == "-" || s == "." {
        return Ok(Tube::new(id, capacity));
    }
    let segments = s
        .chars()
        .enumerate()
        .map(|(pos, c)| {
            Color::from_char(c).map(|color| ids.segment(color)).ok_or_else(|| {
                Error::Parse(format!(
                    "Unrecognized color '{}' in tube {} position {}",
                    c, id, pos
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Tube::from_segments(id, capacity, segments)
}

/// Parses a level file.
///
/// Blank lines and lines starting with `#` are ignored. An optional
/// `capacity N` line sets the tube capacity; without it the capacity is the
/// length of the longest tube. Every other line is one tube, bottom first,
/// with `-` marking an empty tube.
pub fn parse_level_text(text: &str) -> Result<Vec<Tube>> {
    let mut capacity = None;
    let mut rows = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(value) = line.strip_prefix("capacity") {
            let value = value.trim().trim_start_matches('=').trim();
            let parsed = value
                .parse::<usize>()
                .map_err(|e| Error::Parse(format!("Invalid capacity '{}': {}", value, e)))?;
            capacity = Some(parsed);
            continue;
        }
        rows.push(line);
    }

    if rows.is_empty() {
        return Err(Error::Parse("Level contains no tubes".to_string()));
    }
    let capacity = capacity.unwrap_or_else(|| {
        rows.iter()
            .map(|r| if *r == "-" { 0 } else { r.chars().count() })
            .max()
            .unwrap_or(1)
    });
    tubes_from_str_array(capacity, &rows)
}

/// Renders tubes as lines of color letters, one tube per line.
///
/// Empty slots are shown as `.` so every line is `capacity` wide. The
/// selected tube, if any, is marked with `>`.
pub fn tubes_to_string(tubes: &[Tube], selected: Option<usize>) -> String {
    tubes
        .iter()
        .map(|tube| {
            let marker = if selected == Some(tube.id()) { '>' } else { ' ' };
            let mut line = format!("{}{:>2} |", marker, tube.id());
            line.extend(tube.segments().iter().map(|s| s.color.to_char()));
            line.extend(std::iter::repeat('.').take(tube.capacity() - tube.len()));
            line.push('|');
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Like `tubes_to_string`, but paints each segment with its palette color.
pub fn tubes_to_ansi_string(tubes: &[Tube], selected: Option<usize>) -> String {
    tubes
        .iter()
        .map(|tube| {
            let marker = if selected == Some(tube.id()) { '>' } else { ' ' };
            let mut line = format!("{}{:>2} |", marker, tube.id());
            for segment in tube.segments() {
                line.push_str(&format!(
                    "{} {} \x1b[m",
                    segment.color.to_ansi_background(),
                    segment.color.to_char()
                ));
            }
            line.push_str(&"   ".repeat(tube.capacity() - tube.len()));
            line.push('|');
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
