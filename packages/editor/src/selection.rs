//! # Structural Selection
//!
//! Selection grows in stages. A caret or inline range stays inside one note;
//! extending past the edge of the note switches to structural mode, where
//! whole notes (with their subtrees) are selected.
//!
//! ```text
//!  Caret ──extend──▶ Inline ──extend at edge──▶ Structural(1) ──extend──▶ Structural(n+1)
//!    ▲                                              │
//!    └──────────── collapse / set_selection ────────┘
//! ```
//!
//! In structural mode the selected notes are summarised as *heads*: the
//! topmost notes whose subtrees together cover the range. Extension only
//! ever grows the covered region. The state machine is owned by the edit
//! session.

use crate::outline::{NodeKey, Outline};
use std::cmp::Ordering;

/// A character offset inside a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub item: NodeKey,
    pub offset: usize,
}

impl Point {
    pub fn new(item: NodeKey, offset: usize) -> Self {
        Self { item, offset }
    }

    pub fn start_of(item: NodeKey) -> Self {
        Self::new(item, 0)
    }

    pub fn end_of(outline: &Outline, item: NodeKey) -> Self {
        Self::new(item, outline.text_len(item))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSelection {
    pub anchor: Point,
    pub focus: Point,
}

impl RangeSelection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn caret(point: Point) -> Self {
        Self::new(point, point)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Endpoints in document order
    pub fn ordered(&self, outline: &Outline) -> (Point, Point) {
        let order = outline
            .compare_order(self.anchor.item, self.focus.item)
            .then(self.anchor.offset.cmp(&self.focus.offset));
        match order {
            Ordering::Greater => (self.focus, self.anchor),
            _ => (self.anchor, self.focus),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseEdge {
    Start,
    End,
    /// Start after extending up, end otherwise
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionStage {
    #[default]
    Caret,
    Inline,
    Structural {
        stage: u32,
        heads: Vec<NodeKey>,
    },
}

/// Selection state of one editing session
#[derive(Debug, Clone, Default)]
pub struct StructuralSelection {
    range: Option<RangeSelection>,
    stage: SelectionStage,
    /// Direction of the last extension, used by [`CollapseEdge::Auto`]
    direction: Option<Direction>,
}

impl StructuralSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self) -> Option<&RangeSelection> {
        self.range.as_ref()
    }

    pub fn stage(&self) -> &SelectionStage {
        &self.stage
    }

    pub fn is_structural(&self) -> bool {
        matches!(self.stage, SelectionStage::Structural { .. })
    }

    /// Selected notes in structural mode, empty otherwise
    pub fn heads(&self) -> &[NodeKey] {
        match &self.stage {
            SelectionStage::Structural { heads, .. } => heads,
            _ => &[],
        }
    }

    pub fn head_note_ids(&self, outline: &Outline) -> Vec<String> {
        self.heads()
            .iter()
            .filter_map(|&head| outline.note_id(head))
            .map(str::to_string)
            .collect()
    }

    /// Replace the selection programmatically
    ///
    /// A range inside one note becomes a caret or inline selection and never
    /// promotes. A range whose endpoints lie in different notes cannot be
    /// inline, so it starts structural at stage 1 with every head it covers.
    pub fn set_selection(&mut self, outline: &Outline, range: RangeSelection) {
        let anchor = outline.content_owner(range.anchor.item);
        let focus = outline.content_owner(range.focus.item);
        self.stage = if range.is_collapsed() {
            SelectionStage::Caret
        } else if anchor == focus {
            SelectionStage::Inline
        } else {
            SelectionStage::Structural {
                stage: 1,
                heads: resolve_heads(outline, &range),
            }
        };
        self.range = Some(range);
        self.direction = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop the selection if it points at removed notes
    pub fn retain_attached(&mut self, outline: &Outline) {
        let attached = self.range.map_or(true, |range| {
            outline.is_attached(range.anchor.item) && outline.is_attached(range.focus.item)
        });
        if !attached {
            tracing::debug!("selection pointed at removed notes, clearing");
            self.clear();
        }
    }

    /// Shift+Up / Shift+Down
    pub fn extend(&mut self, outline: &Outline, direction: Direction) {
        let Some(range) = self.range else { return };
        self.direction = Some(direction);

        if let SelectionStage::Structural { stage, heads } = &self.stage {
            let (stage, heads) = (*stage, heads.clone());
            self.extend_structural(outline, direction, stage, &heads);
            return;
        }

        let focus = range.focus;
        let edge = match direction {
            Direction::Up => Point::start_of(focus.item),
            Direction::Down => Point::end_of(outline, focus.item),
        };
        if focus != edge {
            let range = RangeSelection::new(range.anchor, edge);
            self.stage = if range.is_collapsed() {
                SelectionStage::Caret
            } else {
                SelectionStage::Inline
            };
            self.range = Some(range);
            return;
        }

        // At the edge of the note: select the note with its subtree.
        let Some(origin) = outline.content_owner(range.anchor.item) else {
            return;
        };
        let first = Point::start_of(origin);
        let last = Point::end_of(outline, outline.last_descendant(origin));
        let range = match direction {
            Direction::Down => RangeSelection::new(first, last),
            Direction::Up => RangeSelection::new(last, first),
        };
        tracing::debug!(?direction, "selection promoted to structural");
        self.range = Some(range);
        self.stage = SelectionStage::Structural {
            stage: 1,
            heads: vec![origin],
        };
    }

    /// Grow the covered region by the next note outside it
    ///
    /// The range is re-anchored on the far edge of the current heads, so the
    /// new heads always cover every note the old ones did.
    fn extend_structural(
        &mut self,
        outline: &Outline,
        direction: Direction,
        stage: u32,
        heads: &[NodeKey],
    ) {
        let (Some(&first), Some(&last)) = (heads.first(), heads.last()) else {
            return;
        };
        let start = Point::start_of(first);
        let end = Point::end_of(outline, outline.last_descendant(last));

        let (anchor, next) = match direction {
            Direction::Down => (start, outline.next_content_item(end.item)),
            Direction::Up => (end, outline.previous_content_item(first)),
        };
        let Some(next) = next else { return };

        let focus = match direction {
            Direction::Down => Point::end_of(outline, next),
            Direction::Up => Point::start_of(next),
        };
        let range = RangeSelection::new(anchor, focus);
        let heads = resolve_heads(outline, &range);
        self.range = Some(range);
        self.stage = SelectionStage::Structural {
            stage: stage + 1,
            heads,
        };
    }

    /// Collapse to a caret; returns the new caret
    ///
    /// In structural mode the start is the first head and the end is the
    /// end of the last head's last descendant.
    pub fn collapse(&mut self, outline: &Outline, edge: CollapseEdge) -> Option<Point> {
        let range = self.range?;
        let edge = match edge {
            CollapseEdge::Auto if self.direction == Some(Direction::Up) => CollapseEdge::Start,
            CollapseEdge::Auto => CollapseEdge::End,
            other => other,
        };

        let caret = match (&self.stage, edge) {
            (SelectionStage::Structural { heads, .. }, CollapseEdge::Start) => {
                heads.first().map(|&head| Point::start_of(head))
            }
            (SelectionStage::Structural { heads, .. }, _) => heads
                .last()
                .map(|&head| Point::end_of(outline, outline.last_descendant(head))),
            (_, CollapseEdge::Start) => Some(range.ordered(outline).0),
            _ => Some(range.ordered(outline).1),
        }?;

        self.set_selection(outline, RangeSelection::caret(caret));
        Some(caret)
    }
}

/// Topmost notes covering `range`
///
/// Both endpoints are mapped to their notes; the notes at the level just
/// below their common ancestor, from the first endpoint's branch to the
/// last's, are the heads. A collapsed range has no heads.
pub fn resolve_heads(outline: &Outline, range: &RangeSelection) -> Vec<NodeKey> {
    if range.is_collapsed() {
        return Vec::new();
    }
    let (Some(a), Some(b)) = (
        outline.content_owner(range.anchor.item),
        outline.content_owner(range.focus.item),
    ) else {
        return Vec::new();
    };
    if a == b {
        return vec![a];
    }

    let (first, last) = match outline.compare_order(a, b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };
    let first_path = outline.content_path(first);
    let last_path = outline.content_path(last);
    let shared = first_path
        .iter()
        .zip(&last_path)
        .take_while(|(x, y)| x == y)
        .count();

    // `first` is an ancestor of `last`: its subtree covers everything.
    if shared == first_path.len() {
        return vec![first];
    }
    let (Some(&start), Some(&end)) = (first_path.get(shared), last_path.get(shared)) else {
        return vec![first];
    };

    let siblings = match shared {
        0 => outline.top_level_items(),
        _ => outline.logical_children(first_path[shared - 1]),
    };
    let (Some(from), Some(to)) = (
        siblings.iter().position(|&key| key == start),
        siblings.iter().position(|&key| key == end),
    ) else {
        return vec![first];
    };
    siblings[from..=to].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use outliner_model::{AttributeRegistry, SerializedDocument, SerializedNode as N};

    /// note1
    ///   note2
    ///     note3
    ///   note4
    /// note5
    fn outline() -> Outline {
        let document = SerializedDocument::from_items(vec![
            N::note(Some("note1"), "one"),
            N::wrapper(vec![
                N::note(Some("note2"), "two"),
                N::wrapper(vec![N::note(Some("note3"), "three")]),
                N::note(Some("note4"), "four"),
            ]),
            N::note(Some("note5"), "five"),
        ]);
        Outline::from_serialized(&document.root, AttributeRegistry::outline())
    }

    fn key(outline: &Outline, id: &str) -> NodeKey {
        outline.find_by_note_id(id).unwrap()
    }

    fn ids(outline: &Outline, keys: &[NodeKey]) -> Vec<String> {
        keys.iter()
            .filter_map(|&key| outline.note_id(key))
            .map(str::to_string)
            .collect()
    }

    fn range(outline: &Outline, from: &str, to: &str) -> RangeSelection {
        RangeSelection::new(
            Point::start_of(key(outline, from)),
            Point::end_of(outline, key(outline, to)),
        )
    }

    #[test]
    fn test_heads_skip_covered_descendants() {
        let outline = outline();
        let heads = resolve_heads(&outline, &range(&outline, "note2", "note4"));
        assert_eq!(ids(&outline, &heads), vec!["note2", "note4"]);
    }

    #[test]
    fn test_heads_collapse_to_ancestor() {
        let outline = outline();
        let heads = resolve_heads(&outline, &range(&outline, "note1", "note3"));
        assert_eq!(ids(&outline, &heads), vec!["note1"]);
    }

    #[test]
    fn test_heads_climb_to_common_level() {
        let outline = outline();
        let heads = resolve_heads(&outline, &range(&outline, "note3", "note5"));
        assert_eq!(ids(&outline, &heads), vec!["note1", "note5"]);

        let backwards = RangeSelection::new(
            Point::end_of(&outline, key(&outline, "note5")),
            Point::start_of(key(&outline, "note3")),
        );
        assert_eq!(resolve_heads(&outline, &backwards), heads);
    }

    #[test]
    fn test_heads_of_collapsed_and_single_note_ranges() {
        let outline = outline();
        let note2 = key(&outline, "note2");
        let caret = RangeSelection::caret(Point::new(note2, 1));
        assert!(resolve_heads(&outline, &caret).is_empty());

        let inline = RangeSelection::new(Point::new(note2, 0), Point::new(note2, 2));
        assert_eq!(resolve_heads(&outline, &inline), vec![note2]);
    }

    #[test]
    fn test_extend_down_from_end_of_note() {
        let outline = outline();
        let note2 = key(&outline, "note2");
        let mut selection = StructuralSelection::new();
        selection.set_selection(&outline, RangeSelection::caret(Point::end_of(&outline, note2)));

        selection.extend(&outline, Direction::Down);
        assert!(selection.is_structural());
        assert_eq!(selection.head_note_ids(&outline), vec!["note2"]);

        selection.extend(&outline, Direction::Down);
        assert_eq!(selection.head_note_ids(&outline), vec!["note2", "note4"]);
        assert_eq!(
            selection.stage(),
            &SelectionStage::Structural {
                stage: 2,
                heads: vec![note2, key(&outline, "note4")]
            }
        );
    }

    #[test]
    fn test_extend_moves_to_note_edge_first() {
        let outline = outline();
        let note2 = key(&outline, "note2");
        let mut selection = StructuralSelection::new();
        selection.set_selection(&outline, RangeSelection::caret(Point::new(note2, 1)));

        selection.extend(&outline, Direction::Down);
        assert_eq!(selection.stage(), &SelectionStage::Inline);
        assert_eq!(
            selection.range().unwrap().focus,
            Point::end_of(&outline, note2)
        );

        selection.extend(&outline, Direction::Down);
        assert!(selection.is_structural());
    }

    #[test]
    fn test_extend_up_reaches_parent() {
        let outline = outline();
        let note4 = key(&outline, "note4");
        let mut selection = StructuralSelection::new();
        selection.set_selection(&outline, RangeSelection::caret(Point::start_of(note4)));

        selection.extend(&outline, Direction::Up);
        assert_eq!(selection.head_note_ids(&outline), vec!["note4"]);

        // note3 lies inside note2, so the heads become note2 and note4.
        selection.extend(&outline, Direction::Up);
        assert_eq!(selection.head_note_ids(&outline), vec!["note2", "note4"]);

        selection.extend(&outline, Direction::Up);
        assert_eq!(selection.head_note_ids(&outline), vec!["note1"]);

        // Nothing precedes note1; the selection stays put.
        selection.extend(&outline, Direction::Up);
        assert_eq!(selection.head_note_ids(&outline), vec!["note1"]);
    }

    #[test]
    fn test_collapse_edges() {
        let outline = outline();
        let note2 = key(&outline, "note2");
        let note3 = key(&outline, "note3");
        let mut selection = StructuralSelection::new();
        selection.set_selection(&outline, RangeSelection::caret(Point::end_of(&outline, note2)));
        selection.extend(&outline, Direction::Down);

        let caret = selection.collapse(&outline, CollapseEdge::End).unwrap();
        assert_eq!(caret, Point::end_of(&outline, note3));
        assert_eq!(selection.stage(), &SelectionStage::Caret);

        selection.set_selection(&outline, RangeSelection::caret(Point::end_of(&outline, note2)));
        selection.extend(&outline, Direction::Down);
        let caret = selection.collapse(&outline, CollapseEdge::Start).unwrap();
        assert_eq!(caret, Point::start_of(note2));
    }

    #[test]
    fn test_set_selection_leaves_structural_mode() {
        let outline = outline();
        let note2 = key(&outline, "note2");
        let mut selection = StructuralSelection::new();
        selection.set_selection(&outline, RangeSelection::caret(Point::end_of(&outline, note2)));
        selection.extend(&outline, Direction::Down);
        assert!(selection.is_structural());

        selection.set_selection(
            &outline,
            RangeSelection::new(Point::new(note2, 0), Point::new(note2, 2)),
        );
        assert_eq!(selection.stage(), &SelectionStage::Inline);
        assert!(selection.heads().is_empty());
    }

    #[test]
    fn test_cross_note_range_is_structural() {
        let outline = outline();
        let note2 = key(&outline, "note2");
        let note4 = key(&outline, "note4");
        let mut selection = StructuralSelection::new();

        selection.set_selection(
            &outline,
            RangeSelection::new(Point::new(note2, 1), Point::new(note4, 2)),
        );
        assert_eq!(
            selection.stage(),
            &SelectionStage::Structural {
                stage: 1,
                heads: vec![note2, note4]
            }
        );

        // note1 holds note2 and note4, so growing never drops them.
        selection.extend(&outline, Direction::Down);
        assert_eq!(selection.head_note_ids(&outline), vec!["note1", "note5"]);
    }

    #[test]
    fn test_extension_keeps_covered_notes() {
        let document = SerializedDocument::from_items(vec![
            N::note(Some("a"), "A"),
            N::note(Some("b"), "B"),
            N::note(Some("c"), "C"),
        ]);
        let outline = Outline::from_serialized(&document.root, AttributeRegistry::outline());
        let b = key(&outline, "b");
        let mut selection = StructuralSelection::new();
        selection.set_selection(&outline, RangeSelection::caret(Point::end_of(&outline, b)));

        selection.extend(&outline, Direction::Down);
        selection.extend(&outline, Direction::Down);
        assert_eq!(selection.head_note_ids(&outline), vec!["b", "c"]);

        selection.extend(&outline, Direction::Up);
        assert_eq!(selection.head_note_ids(&outline), vec!["a", "b", "c"]);
        assert_eq!(
            selection.stage(),
            &SelectionStage::Structural {
                stage: 3,
                heads: vec![key(&outline, "a"), b, key(&outline, "c")]
            }
        );
    }
}
