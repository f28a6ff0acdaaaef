//! Drawing tools and the pointer state machine.
//!
//! Pointer events arrive already mapped to native image coordinates. The
//! machine is either idle or holds exactly one [`DrawingSession`], which
//! carries only the data its tool needs. Brush strokes commit to the mask
//! segment by segment; a rectangle drag only touches the preview surface
//! until the pointer is released.

use crate::geometry::{Point, RectF};
use crate::mask::MaskLayers;

/// The active drawing tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawTool {
    /// Freehand round brush.
    #[default]
    Brush,
    /// Axis-aligned rectangle selection.
    Rect,
}

impl DrawTool {
    /// Get the display name for this tool.
    pub fn name(&self) -> &'static str {
        match self {
            DrawTool::Brush => "Brush",
            DrawTool::Rect => "Rectangle",
        }
    }
}

/// An in-progress pointer drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawingSession {
    Brush { last_point: Point },
    Rect { start: Point, current: Point },
}

impl DrawingSession {
    pub fn tool(&self) -> DrawTool {
        match self {
            DrawingSession::Brush { .. } => DrawTool::Brush,
            DrawingSession::Rect { .. } => DrawTool::Rect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing(DrawingSession),
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolEffect {
    /// Nothing happened (e.g. a move while idle).
    Ignored,
    /// A brush disc or segment was written to the mask.
    StrokeCommitted,
    /// The rectangle preview outline changed.
    PreviewUpdated(RectF),
    /// A rectangle was written to the mask.
    RectCommitted(RectF),
    /// A rectangle drag was abandoned without touching the mask.
    PreviewDiscarded,
    /// A brush session ended; its segments are already committed.
    StrokeEnded,
}

impl ToolEffect {
    /// True when the effect wrote to the mask.
    pub fn mutated_mask(&self) -> bool {
        matches!(self, ToolEffect::StrokeCommitted | ToolEffect::RectCommitted(_))
    }
}

/// Pointer state machine for the mask editor.
#[derive(Debug, Clone, Default)]
pub struct ToolMachine {
    /// Tool used by the next session.
    tool: DrawTool,
    state: DrawState,
}

impl ToolMachine {
    pub fn new(tool: DrawTool) -> Self {
        Self {
            tool,
            state: DrawState::Idle,
        }
    }

    pub fn tool(&self) -> DrawTool {
        self.tool
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing(_))
    }

    /// Select the tool for the next session.
    ///
    /// A rectangle drag in progress is aborted and its preview discarded. A
    /// brush stroke in progress keeps going under the brush until the
    /// pointer is released.
    pub fn set_tool(&mut self, tool: DrawTool, layers: &mut MaskLayers) -> ToolEffect {
        let effect = match self.state {
            DrawState::Drawing(DrawingSession::Rect { .. }) if tool != DrawTool::Rect => {
                log::debug!("Tool switched mid-drag, discarding rectangle preview");
                layers.preview.clear();
                self.state = DrawState::Idle;
                ToolEffect::PreviewDiscarded
            }
            _ => ToolEffect::Ignored,
        };
        self.tool = tool;
        effect
    }

    /// Start a session at `point`. A brush commits its first dab immediately.
    pub fn pointer_down(&mut self, point: Point, layers: &mut MaskLayers) -> ToolEffect {
        if self.is_drawing() {
            // A missed release; close the old session before starting over.
            self.pointer_leave(layers);
        }

        match self.tool {
            DrawTool::Brush => {
                layers.mask.paint_stroke(point, true);
                layers
                    .preview
                    .mirror_stroke(point, point, layers.mask.brush_size());
                self.state = DrawState::Drawing(DrawingSession::Brush { last_point: point });
                ToolEffect::StrokeCommitted
            }
            DrawTool::Rect => {
                self.state = DrawState::Drawing(DrawingSession::Rect {
                    start: point,
                    current: point,
                });
                ToolEffect::Ignored
            }
        }
    }

    pub fn pointer_move(&mut self, point: Point, layers: &mut MaskLayers) -> ToolEffect {
        match &mut self.state {
            DrawState::Idle => ToolEffect::Ignored,
            DrawState::Drawing(DrawingSession::Brush { last_point }) => {
                layers.mask.paint_stroke(point, false);
                layers
                    .preview
                    .mirror_stroke(*last_point, point, layers.mask.brush_size());
                *last_point = point;
                ToolEffect::StrokeCommitted
            }
            DrawState::Drawing(DrawingSession::Rect { start, current }) => {
                *current = point;
                ToolEffect::PreviewUpdated(layers.preview.show_rect_outline(*start, point))
            }
        }
    }

    /// Finish the session. A rectangle is committed using `point` as its
    /// final corner.
    pub fn pointer_up(&mut self, point: Point, layers: &mut MaskLayers) -> ToolEffect {
        let DrawState::Drawing(session) = std::mem::take(&mut self.state) else {
            return ToolEffect::Ignored;
        };
        match session {
            DrawingSession::Brush { .. } => {
                layers.mask.end_stroke();
                ToolEffect::StrokeEnded
            }
            DrawingSession::Rect { start, .. } => {
                layers.mask.paint_rect(start, point);
                layers.preview.clear();
                ToolEffect::RectCommitted(RectF::from_corners(start, point))
            }
        }
    }

    /// The pointer left the surface: a rectangle drag is abandoned, a brush
    /// stroke simply ends.
    pub fn pointer_leave(&mut self, layers: &mut MaskLayers) -> ToolEffect {
        let DrawState::Drawing(session) = std::mem::take(&mut self.state) else {
            return ToolEffect::Ignored;
        };
        match session {
            DrawingSession::Brush { .. } => {
                layers.mask.end_stroke();
                ToolEffect::StrokeEnded
            }
            DrawingSession::Rect { .. } => {
                layers.preview.clear();
                ToolEffect::PreviewDiscarded
            }
        }
    }

    /// Drop any session without touching the layers.
    pub fn cancel(&mut self) {
        self.state = DrawState::Idle;
    }
}
