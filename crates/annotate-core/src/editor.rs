//! Headless editor session: gesture handling, label commit, dirty tracking
//!
//! One session owns the annotation list and its history; nothing outside the
//! session mutates them. The drawing gesture is a two-phase commit: the drag
//! proposes a candidate rectangle, and `commit_label` either finalizes it
//! (non-empty label) or discards it. This keeps the gesture logic independent
//! of whatever dialog mechanism collects the label.

use tracing::debug;

use crate::annotation::{Annotation, DrawingToolConfig, LabelFont};
use crate::coords::{self, Point, Viewport};
use crate::history::History;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No source asset loaded yet.
    Idle,
    /// Asset displayed, no gesture in progress.
    Ready,
    /// Mouse is down, candidate rectangle is being sized.
    Drawing,
    /// Drag finished, waiting for a label before the rectangle is kept.
    PendingLabel,
    /// Asset failed to load; drawing and saving are disabled.
    LoadError(String),
}

/// Result of releasing the mouse at the end of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// No drag was in progress.
    Ignored,
    /// Candidate was under the minimum size and was dropped silently.
    Discarded,
    /// Candidate is held pending a label (`commit_label`).
    NeedsLabel,
}

struct PendingRect {
    origin: Point,
    annotation: Annotation,
    config: DrawingToolConfig,
}

pub const MIME_PNG: &str = "image/png";
pub const MIME_PDF: &str = "application/pdf";

/// Flattened artifact handed to the caller's save path.
#[derive(Debug, Clone)]
pub struct SaveOutput {
    pub bytes: Vec<u8>,
    pub annotations: Vec<Annotation>,
    pub mime: &'static str,
}

/// Dirty-flag change notification, fired only on transitions.
pub type ChangeListener = Box<dyn FnMut(bool)>;

pub struct EditorSession {
    state: SessionState,
    annotations: Vec<Annotation>,
    /// Snapshot captured at load time / after a successful save; the dirty
    /// flag is a content comparison against this.
    baseline: Vec<Annotation>,
    history: History,
    viewport: Viewport,
    pending: Option<PendingRect>,
    next_seq: u64,
    read_only: bool,
    dirty: bool,
    generation: u64,
    on_changes: Option<ChangeListener>,
}

impl EditorSession {
    pub fn new(read_only: bool) -> Self {
        Self {
            state: SessionState::Idle,
            annotations: Vec::new(),
            baseline: Vec::new(),
            history: History::new(),
            viewport: Viewport::default(),
            pending: None,
            next_seq: 1,
            read_only,
            dirty: false,
            generation: 0,
            on_changes: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Register the dirty-flag transition callback.
    pub fn set_on_changes(&mut self, listener: ChangeListener) {
        self.on_changes = Some(listener);
    }

    // ---- load lifecycle -------------------------------------------------

    /// Start a load and return its generation token. A newer `begin_load`
    /// supersedes any in-flight one: completions carrying a stale token are
    /// discarded, so a slow-resolving old load can never overwrite a newer
    /// asset's session state.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Commit a finished load. Resets annotations, history, and viewport.
    /// Returns false (and changes nothing) when the token is stale.
    pub fn complete_load(&mut self, token: u64) -> bool {
        if token != self.generation {
            debug!(token, current = self.generation, "discarding stale load");
            return false;
        }
        self.annotations.clear();
        self.baseline.clear();
        self.history.reset();
        self.viewport = Viewport::default();
        self.pending = None;
        self.next_seq = 1;
        self.state = SessionState::Ready;
        self.update_dirty();
        true
    }

    /// Record a failed load. Stale failures are ignored too.
    pub fn fail_load(&mut self, token: u64, message: String) -> bool {
        if token != self.generation {
            return false;
        }
        self.pending = None;
        self.state = SessionState::LoadError(message);
        true
    }

    // ---- viewport -------------------------------------------------------

    pub fn fit_viewport(
        &mut self,
        asset_size: (f64, f64),
        container_size: (f64, f64),
        padding: f64,
    ) {
        self.viewport = coords::fit_to_container(
            asset_size.0,
            asset_size.1,
            container_size.0,
            container_size.1,
            padding,
        );
    }

    pub fn wheel_zoom(&mut self, pointer: Point, zoom_in: bool) {
        self.viewport = coords::wheel_zoom(pointer, &self.viewport, zoom_in);
    }

    // ---- drawing gesture ------------------------------------------------

    /// True when a drawing gesture may start.
    pub fn can_draw(&self) -> bool {
        !self.read_only && self.state == SessionState::Ready
    }

    /// Mouse-down with the tool armed: start a zero-size candidate at the
    /// transformed pointer position. No-op when read-only or not ready.
    pub fn begin_drag(&mut self, pointer: Point, config: &DrawingToolConfig) {
        if !self.can_draw() {
            return;
        }
        let origin = coords::to_canvas_point(pointer, &self.viewport);
        let annotation = Annotation {
            id: String::new(),
            x: origin.x,
            y: origin.y,
            width: 0.0,
            height: 0.0,
            color: config.color.clone(),
            label: String::new(),
            badge_x: 0.0,
            badge_y: 0.0,
            label_width: 0.0,
            label_height: 0.0,
        };
        self.pending = Some(PendingRect {
            origin,
            annotation,
            config: config.clone(),
        });
        self.state = SessionState::Drawing;
    }

    /// Mouse-move: live-update the candidate's signed extents.
    pub fn update_drag(&mut self, pointer: Point) {
        if self.state != SessionState::Drawing {
            return;
        }
        let p = coords::to_canvas_point(pointer, &self.viewport);
        if let Some(pending) = self.pending.as_mut() {
            pending.annotation.width = p.x - pending.origin.x;
            pending.annotation.height = p.y - pending.origin.y;
        }
    }

    /// Mouse-up: keep the candidate for labeling when it clears the minimum
    /// size, otherwise drop it silently.
    pub fn finish_drag(&mut self) -> DragOutcome {
        if self.state != SessionState::Drawing {
            return DragOutcome::Ignored;
        }
        let meets_minimum = self
            .pending
            .as_ref()
            .is_some_and(|p| p.annotation.meets_minimum_size());
        if !meets_minimum {
            self.pending = None;
            self.state = SessionState::Ready;
            return DragOutcome::Discarded;
        }
        self.state = SessionState::PendingLabel;
        DragOutcome::NeedsLabel
    }

    /// The candidate rectangle currently being drawn or labeled, for live
    /// preview rendering.
    pub fn pending_rect(&self) -> Option<&Annotation> {
        self.pending.as_ref().map(|p| &p.annotation)
    }

    /// Finalize the pending rectangle with a label. An empty (or cancelled)
    /// label discards the candidate. Returns true when an annotation was
    /// appended.
    pub fn commit_label(&mut self, label: &str, font: Option<&LabelFont>) -> bool {
        if self.state != SessionState::PendingLabel {
            return false;
        }
        self.state = SessionState::Ready;
        let Some(mut pending) = self.pending.take() else {
            return false;
        };
        if label.trim().is_empty() {
            return false;
        }

        self.history.push(&self.annotations);
        pending.annotation.id = format!("rect{}", self.next_seq);
        self.next_seq += 1;
        pending.annotation.label = label.to_string();
        pending
            .annotation
            .place_badge(pending.config.font_size, font);
        debug!(id = %pending.annotation.id, "annotation added");
        self.annotations.push(pending.annotation);
        self.update_dirty();
        true
    }

    /// Discard the pending candidate without committing (dialog dismissed).
    pub fn cancel_pending(&mut self) {
        if matches!(self.state, SessionState::Drawing | SessionState::PendingLabel) {
            self.pending = None;
            self.state = SessionState::Ready;
        }
    }

    // ---- history --------------------------------------------------------

    pub fn undo(&mut self) {
        if let Some(list) = self.history.undo(&self.annotations) {
            self.annotations = list;
            self.update_dirty();
        }
    }

    pub fn redo(&mut self) {
        if let Some(list) = self.history.redo(&self.annotations) {
            self.annotations = list;
            self.update_dirty();
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---- save / cancel --------------------------------------------------

    /// Mark the session clean after a successful save and capture the new
    /// baseline for dirty comparison.
    pub fn mark_saved(&mut self) {
        self.baseline = self.annotations.clone();
        self.update_dirty();
    }

    /// Discard local edits back to the last baseline and notify. Does not
    /// abort anything in flight; "cancel" is purely local.
    pub fn cancel(&mut self) {
        self.annotations = self.baseline.clone();
        self.history.reset();
        self.pending = None;
        if self.state == SessionState::Drawing || self.state == SessionState::PendingLabel {
            self.state = SessionState::Ready;
        }
        self.update_dirty();
    }

    /// Content comparison against the baseline, order-insensitive: both
    /// lists are compared after sorting by id.
    fn update_dirty(&mut self) {
        let dirty = !lists_equal_by_id(&self.annotations, &self.baseline);
        if dirty != self.dirty {
            self.dirty = dirty;
            if let Some(listener) = self.on_changes.as_mut() {
                listener(dirty);
            }
        }
    }
}

fn lists_equal_by_id(a: &[Annotation], b: &[Annotation]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<&Annotation> = a.iter().collect();
    let mut b: Vec<&Annotation> = b.iter().collect();
    a.sort_by(|l, r| l.id.cmp(&r.id));
    b.sort_by(|l, r| l.id.cmp(&r.id));
    a.iter().zip(b.iter()).all(|(l, r)| l == r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ready_session() -> EditorSession {
        let mut s = EditorSession::new(false);
        let token = s.begin_load();
        assert!(s.complete_load(token));
        s
    }

    fn draw_rect(s: &mut EditorSession, from: (f64, f64), to: (f64, f64), label: &str) -> bool {
        s.begin_drag(Point::new(from.0, from.1), &DrawingToolConfig::default());
        s.update_drag(Point::new(to.0, to.1));
        match s.finish_drag() {
            DragOutcome::NeedsLabel => s.commit_label(label, None),
            _ => false,
        }
    }

    #[test]
    fn test_accepted_rectangle_geometry() {
        let mut s = ready_session();
        assert!(draw_rect(&mut s, (50.0, 50.0), (150.0, 120.0), "Sig"));
        let anns = s.annotations();
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].id, "rect1");
        assert_eq!(anns[0].x, 50.0);
        assert_eq!(anns[0].y, 50.0);
        assert_eq!(anns[0].width, 100.0);
        assert_eq!(anns[0].height, 70.0);
        assert_eq!(anns[0].label, "Sig");
    }

    #[test]
    fn test_minimum_size_rejection() {
        let mut s = ready_session();
        s.begin_drag(Point::new(0.0, 0.0), &DrawingToolConfig::default());
        s.update_drag(Point::new(10.0, 200.0));
        assert_eq!(s.finish_drag(), DragOutcome::Discarded);
        assert!(s.annotations().is_empty());
        // Label commit after a discard must not resurrect the candidate
        assert!(!s.commit_label("Sig", None));
        assert!(s.annotations().is_empty());
    }

    #[test]
    fn test_empty_label_rejection() {
        let mut s = ready_session();
        s.begin_drag(Point::new(0.0, 0.0), &DrawingToolConfig::default());
        s.update_drag(Point::new(100.0, 100.0));
        assert_eq!(s.finish_drag(), DragOutcome::NeedsLabel);
        assert!(!s.commit_label("   ", None));
        assert!(s.annotations().is_empty());
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_read_only_gestures_are_noops() {
        let mut s = EditorSession::new(true);
        let token = s.begin_load();
        s.complete_load(token);
        s.begin_drag(Point::new(0.0, 0.0), &DrawingToolConfig::default());
        s.update_drag(Point::new(100.0, 100.0));
        assert_eq!(s.finish_drag(), DragOutcome::Ignored);
        assert!(s.annotations().is_empty());
    }

    #[test]
    fn test_drag_respects_viewport_transform() {
        let mut s = ready_session();
        s.viewport = Viewport {
            scale: 2.0,
            offset_x: 100.0,
            offset_y: 100.0,
        };
        assert!(draw_rect(&mut s, (200.0, 200.0), (400.0, 340.0), "A"));
        let a = &s.annotations()[0];
        // (200-100)/2 = 50; extents (400-200)/2 = 100, (340-200)/2 = 70
        assert_eq!((a.x, a.y, a.width, a.height), (50.0, 50.0, 100.0, 70.0));
    }

    #[test]
    fn test_dirty_flag_lifecycle() {
        let mut s = ready_session();
        assert!(!s.is_dirty());

        assert!(draw_rect(&mut s, (0.0, 0.0), (100.0, 100.0), "A"));
        assert!(s.is_dirty());

        s.undo();
        assert!(!s.is_dirty());

        s.redo();
        assert!(s.is_dirty());

        s.mark_saved();
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_on_changes_fires_only_on_transitions() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);

        let mut s = ready_session();
        s.set_on_changes(Box::new(move |dirty| sink.borrow_mut().push(dirty)));

        assert!(draw_rect(&mut s, (0.0, 0.0), (100.0, 100.0), "A"));
        assert!(draw_rect(&mut s, (0.0, 0.0), (60.0, 60.0), "B"));
        s.undo();
        s.undo();
        assert_eq!(*events.borrow(), vec![true, false]);
    }

    #[test]
    fn test_ids_are_monotonic_across_undo() {
        let mut s = ready_session();
        assert!(draw_rect(&mut s, (0.0, 0.0), (100.0, 100.0), "A"));
        s.undo();
        assert!(draw_rect(&mut s, (0.0, 0.0), (60.0, 60.0), "B"));
        assert_eq!(s.annotations()[0].id, "rect2");
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut s = EditorSession::new(false);
        let old = s.begin_load();
        let new = s.begin_load();
        assert!(!s.complete_load(old));
        assert_eq!(*s.state(), SessionState::Idle);
        assert!(s.complete_load(new));
        assert_eq!(*s.state(), SessionState::Ready);
    }

    #[test]
    fn test_load_resets_session_state() {
        let mut s = ready_session();
        assert!(draw_rect(&mut s, (0.0, 0.0), (100.0, 100.0), "A"));
        assert!(s.can_undo());

        let token = s.begin_load();
        assert!(s.complete_load(token));
        assert!(s.annotations().is_empty());
        assert!(!s.can_undo());
        assert!(!s.is_dirty());
        assert_eq!(*s.viewport(), Viewport::default());
    }

    #[test]
    fn test_cancel_restores_baseline() {
        let mut s = ready_session();
        assert!(draw_rect(&mut s, (0.0, 0.0), (100.0, 100.0), "A"));
        s.mark_saved();
        assert!(draw_rect(&mut s, (0.0, 0.0), (80.0, 80.0), "B"));
        assert!(s.is_dirty());

        s.cancel();
        assert_eq!(s.annotations().len(), 1);
        assert_eq!(s.annotations()[0].label, "A");
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_load_error_disables_drawing() {
        let mut s = EditorSession::new(false);
        let token = s.begin_load();
        assert!(s.fail_load(token, "bad bytes".into()));
        assert!(matches!(s.state(), SessionState::LoadError(_)));
        assert!(!s.can_draw());
        s.begin_drag(Point::new(0.0, 0.0), &DrawingToolConfig::default());
        assert_eq!(s.finish_drag(), DragOutcome::Ignored);
    }
}
