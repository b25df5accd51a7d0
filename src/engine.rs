//! Core state model and move engine for the tube-sorting puzzle.
//!
//! This module defines the game's fundamental components:
//! - `Color`: an opaque palette token carried by every segment.
//! - `Segment`: a single colored unit, tagged with an identifier for renderers.
//! - `Tube`: a capacity-bounded stack of segments (index 0 is the bottom).
//! - `Move` and `LevelConfig`: recorded pours and the restart baseline of a level.
//!
//! The pour rules live here as pure functions: `contiguous_top_run`,
//! `transfer_count`, `validate_move`, `execute_move` and `apply_move_to_tubes`.
//! None of them mutate their inputs; every pour produces fresh tube values.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

/// Hex code and display letter for each palette entry.
const PALETTE: [(&str, char); 12] = [
    ("#FF6B6B", 'R'), // red
    ("#45B7D1", 'B'), // blue
    ("#F7DC6F", 'Y'), // yellow
    ("#52BE80", 'G'), // green
    ("#BB8FCE", 'P'), // purple
    ("#FFA07A", 'S'), // salmon
    ("#4ECDC4", 'T'), // teal
    ("#EC7063", 'C'), // coral
    ("#98D8C8", 'M'), // mint
    ("#F8B88B", 'K'), // peach
    ("#AAB7B8", 'A'), // gray
    ("#85C1E2", 'U'), // sky blue
];

/// Number of distinct colors the palette can supply.
pub const MAX_COLORS: usize = PALETTE.len();

/// An opaque color token. Two segments match exactly when their colors are equal.
///
/// The token is an index into a fixed palette, which keeps it `Copy` and
/// makes solver state keys a plain byte sequence. It serializes as that
/// index; deserializing an index outside the palette fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Color(u8);

impl TryFrom<u8> for Color {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Color::from_index(index as usize)
            .ok_or_else(|| Error::Parse(format!("color index {} is outside the palette", index)))
    }
}

impl From<Color> for u8 {
    fn from(color: Color) -> u8 {
        color.0
    }
}

impl Color {
    pub const RED: Color = Color(0);
    pub const BLUE: Color = Color(1);
    pub const YELLOW: Color = Color(2);
    pub const GREEN: Color = Color(3);
    pub const PURPLE: Color = Color(4);

    /// Returns the palette color at `index`, or `None` past the end of the palette.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < MAX_COLORS).then(|| Color(index as u8))
    }

    /// Looks a color up by its single-letter code (case-insensitive).
    ///
    /// # Examples
    ///
    /// ```
    /// use tube_sort_solver::engine::Color;
    /// assert_eq!(Color::from_char('r'), Some(Color::RED));
    /// assert_eq!(Color::from_char('?'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        let up = c.to_ascii_uppercase();
        PALETTE
            .iter()
            .position(|&(_, letter)| letter == up)
            .map(|i| Color(i as u8))
    }

    /// Returns the first `count` palette colors, capped at the palette size.
    pub fn palette(count: usize) -> Vec<Color> {
        (0..count.min(MAX_COLORS)).map(|i| Color(i as u8)).collect()
    }

    /// Position of the color in the palette, always below `MAX_COLORS`.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-letter code used by the text renderers and level files.
    pub fn to_char(self) -> char {
        PALETTE[self.index()].1
    }

    /// Hex code of the color, e.g. `#FF6B6B` for red.
    pub fn hex(self) -> &'static str {
        PALETTE[self.index()].0
    }

    /// Returns the ANSI true-color background escape for terminal output.
    pub(crate) fn to_ansi_background(self) -> String {
        let hex = self.hex().trim_start_matches('#');
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).unwrap_or(0);
        format!("\x1b[48;2;{};{};{}m", channel(0), channel(2), channel(4))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex())
    }
}

/// Identifier for a segment, stable while the segment moves between tubes.
///
/// Only renderers care about it; game logic compares colors alone.
pub type SegmentId = u32;

/// A single colored unit stacked inside a tube.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub color: Color,
    pub id: SegmentId,
}

impl Segment {
    pub fn new(color: Color, id: SegmentId) -> Self {
        Segment { color, id }
    }
}

/// Hands out sequential segment ids for one level.
#[derive(Clone, Debug, Default)]
pub struct SegmentIds {
    next: SegmentId,
}

impl SegmentIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a segment of `color` with the next free id.
    pub fn segment(&mut self, color: Color) -> Segment {
        let id = self.next;
        self.next += 1;
        Segment::new(color, id)
    }
}

/// A capacity-bounded stack of segments, bottom at index 0.
///
/// The segment count never exceeds the capacity; constructors enforce it and
/// the move engine only produces tubes that respect it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTube")]
pub struct Tube {
    id: usize,
    segments: Vec<Segment>,
    capacity: usize,
}

#[derive(Deserialize)]
struct RawTube {
    id: usize,
    segments: Vec<Segment>,
    capacity: usize,
}

impl TryFrom<RawTube> for Tube {
    type Error = Error;

    fn try_from(raw: RawTube) -> Result<Self> {
        Tube::from_segments(raw.id, raw.capacity, raw.segments)
    }
}

impl Tube {
    /// Creates an empty tube.
    ///
    /// A zero capacity is raised to 1.
    pub fn new(id: usize, capacity: usize) -> Self {
        Tube {
            id,
            segments: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Creates a tube holding `segments` (bottom first).
    ///
    /// # Errors
    /// Returns `Error::Overfilled` when there are more segments than `capacity`.
    pub fn from_segments(id: usize, capacity: usize, segments: Vec<Segment>) -> Result<Self> {
        let capacity = capacity.max(1);
        if segments.len() > capacity {
            return Err(Error::Overfilled {
                id,
                len: segments.len(),
                capacity,
            });
        }
        Ok(Tube {
            id,
            segments,
            capacity,
        })
    }

    /// Identifier of the tube, unique within a level.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Maximum number of segments the tube can hold (at least 1).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Segments from bottom to top.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The color sequence from bottom to top, without segment ids.
    pub fn colors(&self) -> Vec<Color> {
        self.segments.iter().map(|s| s.color).collect()
    }

    /// Number of segments currently in the tube.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when no more segments fit.
    pub fn is_full(&self) -> bool {
        self.segments.len() >= self.capacity
    }

    /// The topmost segment, or `None` for an empty tube.
    pub fn top(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// True when the tube holds at least one segment and all share a color.
    pub fn is_uniform(&self) -> bool {
        match self.segments.first() {
            Some(first) => self.segments.iter().all(|s| s.color == first.color),
            None => false,
        }
    }

    /// Returns a copy with the top `count` segments removed, plus the removed block.
    fn split_top(&self, count: usize) -> (Tube, Vec<Segment>) {
        let keep = self.segments.len() - count;
        let moved = self.segments[keep..].to_vec();
        let remaining = Tube {
            id: self.id,
            segments: self.segments[..keep].to_vec(),
            capacity: self.capacity,
        };
        (remaining, moved)
    }

    /// Returns a copy with `block` stacked on top, preserving its order.
    fn stacked(&self, block: &[Segment]) -> Tube {
        let mut segments = Vec::with_capacity(self.segments.len() + block.len());
        segments.extend_from_slice(&self.segments);
        segments.extend_from_slice(block);
        Tube {
            id: self.id,
            segments,
            capacity: self.capacity,
        }
    }
}

/// A recorded pour. Immutable once appended to a history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub source_tube_id: usize,
    pub destination_tube_id: usize,
    pub segments_moved: usize,
    /// Wall-clock time of the pour, in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// The baseline a level starts (and restarts) from.
///
/// Deserialization rejects layouts where two tubes share an id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLevelConfig")]
pub struct LevelConfig {
    pub level_id: u32,
    pub colors: Vec<Color>,
    pub initial_tubes: Vec<Tube>,
    pub max_undos: Option<u32>,
}

#[derive(Deserialize)]
struct RawLevelConfig {
    level_id: u32,
    colors: Vec<Color>,
    initial_tubes: Vec<Tube>,
    max_undos: Option<u32>,
}

impl TryFrom<RawLevelConfig> for LevelConfig {
    type Error = Error;

    fn try_from(raw: RawLevelConfig) -> Result<Self> {
        if let Some(id) = duplicate_tube_id(&raw.initial_tubes) {
            return Err(Error::DuplicateTube(id));
        }
        Ok(LevelConfig {
            level_id: raw.level_id,
            colors: raw.colors,
            initial_tubes: raw.initial_tubes,
            max_undos: raw.max_undos,
        })
    }
}

/// Why a pour was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidMove {
    SameTube,
    EmptySource,
    DestinationFull,
    /// Redundant with `DestinationFull`; kept as a last check on available space.
    NoSpace,
}

impl fmt::Display for InvalidMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            InvalidMove::SameTube => "same tube",
            InvalidMove::EmptySource => "empty source",
            InvalidMove::DestinationFull => "destination full",
            InvalidMove::NoSpace => "no space",
        };
        f.write_str(reason)
    }
}

/// Outcome of `validate_move`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub reason: Option<InvalidMove>,
}

impl ValidationResult {
    fn valid() -> Self {
        ValidationResult {
            is_valid: true,
            reason: None,
        }
    }

    fn invalid(reason: InvalidMove) -> Self {
        ValidationResult {
            is_valid: false,
            reason: Some(reason),
        }
    }
}

/// Outcome of `execute_move` on a pair of tubes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveResult {
    pub success: bool,
    pub new_source: Tube,
    pub new_dest: Tube,
    pub segments_moved: usize,
}

/// Outcome of a pour applied to a whole tube collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TubesUpdate {
    pub tubes: Vec<Tube>,
    pub segments_moved: usize,
    pub success: bool,
}

impl TubesUpdate {
    fn unchanged(tubes: &[Tube]) -> Self {
        TubesUpdate {
            tubes: tubes.to_vec(),
            segments_moved: 0,
            success: false,
        }
    }
}

/// Returns the maximal same-color block at the top of `tube`, bottom first.
///
/// This is exactly the block a pour would try to move. An empty tube yields
/// an empty slice.
///
/// # Examples
///
/// ```
/// use tube_sort_solver::engine::{contiguous_top_run, Color};
/// use tube_sort_solver::utils::tube_from_str;
///
/// let tube = tube_from_str(0, 4, "RBBB").unwrap();
/// let run = contiguous_top_run(&tube);
/// assert_eq!(run.len(), 3);
/// assert!(run.iter().all(|s| s.color == Color::BLUE));
/// ```
pub fn contiguous_top_run(tube: &Tube) -> &[Segment] {
    let Some(top) = tube.top() else {
        return &[];
    };
    let start = tube
        .segments
        .iter()
        .rposition(|s| s.color != top.color)
        .map_or(0, |i| i + 1);
    &tube.segments[start..]
}

/// Free slots left in `tube`.
pub fn available_space(tube: &Tube) -> usize {
    tube.capacity.saturating_sub(tube.segments.len())
}

/// Number of segments a pour from `source` into `dest` would move.
pub fn transfer_count(source: &Tube, dest: &Tube) -> usize {
    contiguous_top_run(source).len().min(available_space(dest))
}

/// Checks whether `source` may be poured into `dest`.
///
/// Checks run in order and stop at the first failure: same tube, empty
/// source, full destination, no space. Colors are not matched: any
/// destination with room accepts any block.
pub fn validate_move(source: &Tube, dest: &Tube) -> ValidationResult {
    if source.id == dest.id {
        return ValidationResult::invalid(InvalidMove::SameTube);
    }
    if source.is_empty() {
        return ValidationResult::invalid(InvalidMove::EmptySource);
    }
    if dest.is_full() {
        return ValidationResult::invalid(InvalidMove::DestinationFull);
    }
    if available_space(dest) < 1 {
        return ValidationResult::invalid(InvalidMove::NoSpace);
    }
    ValidationResult::valid()
}

/// Pours the top run of `source` into `dest`, limited by the room in `dest`.
///
/// On an illegal move (or a zero-sized transfer) the result carries
/// `success = false`, copies of the unchanged tubes and `segments_moved = 0`.
pub fn execute_move(source: &Tube, dest: &Tube) -> MoveResult {
    let failed = || MoveResult {
        success: false,
        new_source: source.clone(),
        new_dest: dest.clone(),
        segments_moved: 0,
    };

    if !validate_move(source, dest).is_valid {
        return failed();
    }
    let count = transfer_count(source, dest);
    if count == 0 {
        return failed();
    }

    let (new_source, block) = source.split_top(count);
    let new_dest = dest.stacked(&block);
    MoveResult {
        success: true,
        new_source,
        new_dest,
        segments_moved: count,
    }
}

/// Applies a pour between the tubes with ids `source_id` and `dest_id`.
///
/// Returns a new collection where only the two affected tubes differ from
/// the input. Unknown ids or illegal moves leave the collection unchanged.
pub fn apply_move_to_tubes(tubes: &[Tube], source_id: usize, dest_id: usize) -> TubesUpdate {
    let Some((source, dest)) = locate_pair(tubes, source_id, dest_id) else {
        return TubesUpdate::unchanged(tubes);
    };

    let result = execute_move(&tubes[source], &tubes[dest]);
    if !result.success {
        return TubesUpdate::unchanged(tubes);
    }
    TubesUpdate {
        tubes: replace_pair(tubes, (source, result.new_source), (dest, result.new_dest)),
        segments_moved: result.segments_moved,
        success: true,
    }
}

/// Moves exactly `count` segments from the top of `source_id` onto `dest_id`.
///
/// Fails (collection unchanged) when the pour is illegal, when the source's
/// top run is shorter than `count`, or when the destination lacks room.
pub(crate) fn transfer_exact(
    tubes: &[Tube],
    source_id: usize,
    dest_id: usize,
    count: usize,
) -> TubesUpdate {
    let Some((source, dest)) = locate_pair(tubes, source_id, dest_id) else {
        return TubesUpdate::unchanged(tubes);
    };
    let (source_tube, dest_tube) = (&tubes[source], &tubes[dest]);

    if count == 0
        || !validate_move(source_tube, dest_tube).is_valid
        || contiguous_top_run(source_tube).len() < count
        || available_space(dest_tube) < count
    {
        return TubesUpdate::unchanged(tubes);
    }

    let (new_source, block) = source_tube.split_top(count);
    let new_dest = dest_tube.stacked(&block);
    TubesUpdate {
        tubes: replace_pair(tubes, (source, new_source), (dest, new_dest)),
        segments_moved: count,
        success: true,
    }
}

/// Finds the tube with the given id.
pub fn find_tube(tubes: &[Tube], id: usize) -> Option<&Tube> {
    tubes.iter().find(|t| t.id == id)
}

/// Returns the first id that appears on more than one tube.
pub fn duplicate_tube_id(tubes: &[Tube]) -> Option<usize> {
    let mut seen = HashSet::with_capacity(tubes.len());
    tubes.iter().map(Tube::id).find(|&id| !seen.insert(id))
}

/// Positions of the tubes with the given ids.
fn locate_pair(tubes: &[Tube], source_id: usize, dest_id: usize) -> Option<(usize, usize)> {
    let source = tubes.iter().position(|t| t.id == source_id)?;
    let dest = tubes.iter().position(|t| t.id == dest_id)?;
    Some((source, dest))
}

/// Copies `tubes` with the two positions replaced. Only those two positions
/// change, even if other tubes share an id.
fn replace_pair(tubes: &[Tube], source: (usize, Tube), dest: (usize, Tube)) -> Vec<Tube> {
    let mut next = tubes.to_vec();
    next[source.0] = source.1;
    next[dest.0] = dest.1;
    next
}

/// Per-color segment counts across a collection, indexed by palette position.
pub fn color_counts(tubes: &[Tube]) -> [usize; MAX_COLORS] {
    let mut counts = [0; MAX_COLORS];
    for segment in tubes.iter().flat_map(|t| t.segments.iter()) {
        counts[segment.color.index()] += 1;
    }
    counts
}
