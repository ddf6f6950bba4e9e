//! # Edit Session Management
//!
//! An EditSession is one client's view of a document: the document itself,
//! its key bindings, the selection state machine and the zoom root. Nothing
//! here is shared between sessions.

use crate::keymap::{Command, KeyChord, Keymap};
use crate::outline::{NodeKey, Outline};
use crate::selection::{CollapseEdge, Direction, Point, RangeSelection, StructuralSelection};
use crate::{Document, DocumentOptions, EditorError, Mutation, MutationResult};
use outliner_model::CheckState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-session settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Chord text → command, applied over the default bindings
    pub keymap: HashMap<String, Command>,

    pub validate_on_commit: bool,
}

impl SessionConfig {
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            validate_on_commit: self.validate_on_commit,
        }
    }
}

/// Single edit session
#[derive(Debug)]
pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    document: Document,
    keymap: Keymap,
    selection: StructuralSelection,

    /// Note the view is zoomed into
    zoom_root: Option<String>,
}

impl EditSession {
    pub fn new(
        id: impl Into<String>,
        document: Document,
        config: &SessionConfig,
    ) -> Result<Self, EditorError> {
        let id = id.into();
        let keymap = Keymap::with_overrides(&config.keymap)?;
        tracing::info!(session = %id, doc_id = document.doc_id(), "opened edit session");
        Ok(Self {
            id,
            document,
            keymap,
            selection: StructuralSelection::new(),
            zoom_root: None,
        })
    }

    pub fn doc_id(&self) -> &str {
        self.document.doc_id()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn outline(&self) -> &Outline {
        self.document.outline()
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn keymap_mut(&mut self) -> &mut Keymap {
        &mut self.keymap
    }

    pub fn selection(&self) -> &StructuralSelection {
        &self.selection
    }

    pub fn zoom_root(&self) -> Option<&str> {
        self.zoom_root.as_deref()
    }

    /// Place the caret inside a note; the offset is clamped to its text
    pub fn set_caret(&mut self, note_id: &str, offset: usize) -> Result<(), EditorError> {
        let point = self.point(note_id, offset)?;
        self.selection
            .set_selection(self.document.outline(), RangeSelection::caret(point));
        Ok(())
    }

    /// Select from one note offset to another
    pub fn select(
        &mut self,
        anchor: (&str, usize),
        focus: (&str, usize),
    ) -> Result<(), EditorError> {
        let range = RangeSelection::new(self.point(anchor.0, anchor.1)?, self.point(focus.0, focus.1)?);
        self.selection.set_selection(self.document.outline(), range);
        Ok(())
    }

    fn point(&self, note_id: &str, offset: usize) -> Result<Point, EditorError> {
        let outline = self.outline();
        let item = outline
            .find_by_note_id(note_id)
            .ok_or_else(|| EditorError::NoteNotFound(note_id.to_string()))?;
        Ok(Point::new(item, offset.min(outline.text_len(item))))
    }

    /// Apply one mutation as its own transaction
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationResult, EditorError> {
        let result = self.document.apply(mutation);
        self.after_edit();
        result
    }

    /// Dispatch a key chord through the keymap
    ///
    /// Returns the command that ran, or `None` if the chord is unbound.
    pub fn handle_key(&mut self, chord: KeyChord) -> Result<Option<Command>, EditorError> {
        let Some(command) = self.keymap.lookup(&chord) else {
            tracing::trace!(session = %self.id, %chord, "unbound key");
            return Ok(None);
        };
        tracing::debug!(session = %self.id, %chord, ?command, "key command");
        self.execute(command)?;
        Ok(Some(command))
    }

    pub fn execute(&mut self, command: Command) -> Result<(), EditorError> {
        match command {
            Command::ExtendSelectionUp => {
                self.selection.extend(self.document.outline(), Direction::Up);
            }
            Command::ExtendSelectionDown => {
                self.selection.extend(self.document.outline(), Direction::Down);
            }
            Command::MoveUp => self.move_caret(Direction::Up),
            Command::MoveDown => self.move_caret(Direction::Down),
            Command::CollapseSelection => {
                self.selection
                    .collapse(self.document.outline(), CollapseEdge::Auto);
            }
            Command::Indent => self.indent()?,
            Command::Outdent => self.outdent()?,
            Command::ToggleFold => self.toggle_fold()?,
            Command::ToggleCheck => self.toggle_check()?,
            Command::ZoomIn => {
                if let Some(note_id) = self.caret_note_id() {
                    self.zoom_to(&note_id)?;
                }
            }
            Command::ZoomOut => {
                self.zoom_out();
            }
        }
        Ok(())
    }

    /// Zoom the view into a note's subtree
    pub fn zoom_to(&mut self, note_id: &str) -> Result<(), EditorError> {
        let outline = self.document.outline();
        let root = outline
            .find_by_note_id(note_id)
            .ok_or_else(|| EditorError::NoteNotFound(note_id.to_string()))?;

        let caret_inside = self
            .selection
            .range()
            .and_then(|range| outline.content_owner(range.focus.item))
            .is_some_and(|item| outline.is_within(item, root));
        if !caret_inside {
            self.selection
                .set_selection(outline, RangeSelection::caret(Point::start_of(root)));
        }

        tracing::debug!(session = %self.id, note_id, "zoomed in");
        self.zoom_root = Some(note_id.to_string());
        Ok(())
    }

    /// Zoom out one level; returns false when already at the top
    pub fn zoom_out(&mut self) -> bool {
        let Some(current) = self.zoom_root.take() else {
            return false;
        };
        let outline = self.document.outline();
        self.zoom_root = outline
            .find_by_note_id(&current)
            .and_then(|item| outline.logical_parent(item))
            .and_then(|parent| outline.note_id(parent))
            .map(str::to_string);
        tracing::debug!(session = %self.id, zoom_root = ?self.zoom_root, "zoomed out");
        true
    }

    fn zoom_key(&self) -> Option<NodeKey> {
        let note_id = self.zoom_root.as_deref()?;
        self.outline().find_by_note_id(note_id)
    }

    /// Whether `item` shows in the current view
    ///
    /// Inside a zoom only the zoom root's subtree shows, and the zoom root's
    /// own fold is ignored.
    pub fn is_visible(&self, item: NodeKey) -> bool {
        let outline = self.outline();
        let zoom = self.zoom_key();
        if let Some(zoom) = zoom {
            if !outline.is_within(item, zoom) {
                return false;
            }
        }
        let mut current = outline.logical_parent(item);
        while let Some(key) = current {
            if Some(key) == zoom {
                break;
            }
            if outline.is_folded(key) {
                return false;
            }
            current = outline.logical_parent(key);
        }
        true
    }

    /// Up/Down: collapse a range, or move the caret to the next visible note
    fn move_caret(&mut self, direction: Direction) {
        let edge = match direction {
            Direction::Up => CollapseEdge::Start,
            Direction::Down => CollapseEdge::End,
        };
        let Some(range) = self.selection.range().copied() else {
            return;
        };
        if !range.is_collapsed() || self.selection.is_structural() {
            self.selection.collapse(self.document.outline(), edge);
            return;
        }

        let outline = self.document.outline();
        let Some(mut current) = outline.content_owner(range.focus.item) else {
            return;
        };
        loop {
            let next = match direction {
                Direction::Up => outline.previous_content_item(current),
                Direction::Down => outline.next_content_item(current),
            };
            let Some(next) = next else { return };
            current = next;
            if self.is_visible(current) {
                break;
            }
        }

        let offset = range.focus.offset.min(outline.text_len(current));
        self.selection
            .set_selection(outline, RangeSelection::caret(Point::new(current, offset)));
    }

    fn caret_note_id(&self) -> Option<String> {
        let outline = self.outline();
        let range = self.selection.range()?;
        let item = outline.content_owner(range.focus.item)?;
        outline.note_id(item).map(str::to_string)
    }

    /// Structural heads, or the note holding the caret
    fn targets(&self) -> Vec<String> {
        if self.selection.is_structural() {
            return self.selection.head_note_ids(self.outline());
        }
        self.caret_note_id().into_iter().collect()
    }

    fn edit_targets(
        &mut self,
        targets: Vec<String>,
        mutation: impl Fn(String) -> Mutation,
    ) -> Result<(), EditorError> {
        if targets.is_empty() {
            return Ok(());
        }
        let result = self.document.update(|txn| {
            for note_id in targets {
                txn.apply(mutation(note_id))?;
            }
            Ok(())
        });
        self.after_edit();
        result
    }

    fn indent(&mut self) -> Result<(), EditorError> {
        let targets = self.targets();
        self.edit_targets(targets, |note_id| Mutation::IndentNote { note_id })
    }

    /// Outdents last head first so the heads stay in order
    fn outdent(&mut self) -> Result<(), EditorError> {
        let mut targets = self.targets();
        targets.reverse();
        self.edit_targets(targets, |note_id| Mutation::OutdentNote { note_id })
    }

    /// All targets take the opposite of the first target's fold
    fn toggle_fold(&mut self) -> Result<(), EditorError> {
        let targets = self.targets();
        let outline = self.outline();
        let Some(first) = targets.first().and_then(|id| outline.find_by_note_id(id)) else {
            return Ok(());
        };
        let folded = !outline.is_folded(first);
        self.edit_targets(targets, |note_id| Mutation::SetFolded { note_id, folded })
    }

    fn toggle_check(&mut self) -> Result<(), EditorError> {
        let targets = self.targets();
        let outline = self.outline();
        let Some(first) = targets.first().and_then(|id| outline.find_by_note_id(id)) else {
            return Ok(());
        };
        let checked = match outline.check_state(first).toggled() {
            CheckState::Checked => Some(true),
            CheckState::Unchecked => Some(false),
            CheckState::Unset => None,
        };
        self.edit_targets(targets, |note_id| Mutation::SetChecked { note_id, checked })
    }

    fn after_edit(&mut self) {
        let outline = self.document.outline();
        self.selection.retain_attached(outline);
        if let Some(root) = &self.zoom_root {
            if outline.find_by_note_id(root).is_none() {
                tracing::debug!(session = %self.id, "zoom root removed, zooming out to top");
                self.zoom_root = None;
            }
        }
    }
}
