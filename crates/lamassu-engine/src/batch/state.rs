use super::error::{BatchError, Result};

/// Lifecycle of a batch: `Idle → Drawing` on `begin`, back on `end`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DrawState {
    #[default]
    Idle,
    Drawing,
}

/// A request that depends on, or changes, the lifecycle state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateChange {
    Begin,
    End,
    /// Geometry write; the name is reported in the error.
    Draw(&'static str),
    Color,
    Shader,
    /// Projection or transform matrix.
    Matrix,
    Blend,
    /// Any other sampler/binding state read at flush time.
    Binding,
}

/// What the caller must do to honour a [`StateChange`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Entered `Drawing`: set up GPU state.
    Enter,
    /// Left `Drawing`: flush and restore GPU state.
    Exit,
    /// Go ahead without flushing.
    Apply,
    /// Queued geometry must be drawn under the old state first.
    FlushThenApply,
}

impl DrawState {
    #[inline]
    pub fn is_drawing(self) -> bool {
        self == Self::Drawing
    }

    /// The single transition function. Setters route through here instead
    /// of checking `is_drawing` themselves.
    pub fn transition(&mut self, change: StateChange) -> Result<Action> {
        use DrawState::{Drawing, Idle};

        match (*self, change) {
            (Idle, StateChange::Begin) => {
                *self = Drawing;
                Ok(Action::Enter)
            }
            (Drawing, StateChange::Begin) => Err(BatchError::AlreadyDrawing),

            (Drawing, StateChange::End) => {
                *self = Idle;
                Ok(Action::Exit)
            }
            (Idle, StateChange::End) => Err(BatchError::NotDrawing { op: "end" }),

            (Drawing, StateChange::Draw(_) | StateChange::Color) => Ok(Action::Apply),
            (Idle, StateChange::Draw(op)) => Err(BatchError::NotDrawing { op }),
            (Idle, StateChange::Color) => Err(BatchError::NotDrawing { op: "set_color" }),

            (Drawing, StateChange::Shader) => Ok(Action::FlushThenApply),
            (Idle, StateChange::Shader) => Err(BatchError::NotDrawing { op: "set_shader" }),

            (Drawing, StateChange::Matrix | StateChange::Blend | StateChange::Binding) => {
                Ok(Action::FlushThenApply)
            }
            (Idle, StateChange::Matrix | StateChange::Blend | StateChange::Binding) => {
                Ok(Action::Apply)
            }
        }
    }

    /// Whether a change that cannot fail needs a flush first.
    ///
    /// Only for changes accepted in both states.
    pub(crate) fn needs_flush(&mut self, change: StateChange) -> bool {
        matches!(self.transition(change), Ok(Action::FlushThenApply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_end_cycle() {
        let mut s = DrawState::Idle;
        assert_eq!(s.transition(StateChange::Begin), Ok(Action::Enter));
        assert!(s.is_drawing());
        assert_eq!(s.transition(StateChange::Begin), Err(BatchError::AlreadyDrawing));
        assert_eq!(s.transition(StateChange::End), Ok(Action::Exit));
        assert_eq!(
            s.transition(StateChange::End),
            Err(BatchError::NotDrawing { op: "end" })
        );
    }

    #[test]
    fn idle_rejects_draw_color_and_shader() {
        let mut s = DrawState::Idle;
        assert_eq!(
            s.transition(StateChange::Draw("draw_region")),
            Err(BatchError::NotDrawing { op: "draw_region" })
        );
        assert!(s.transition(StateChange::Color).is_err());
        assert!(s.transition(StateChange::Shader).is_err());
        assert_eq!(s, DrawState::Idle);
    }

    #[test]
    fn matrices_and_blend_flush_only_while_drawing() {
        let mut s = DrawState::Idle;
        assert!(!s.needs_flush(StateChange::Matrix));
        assert!(!s.needs_flush(StateChange::Blend));
        s.transition(StateChange::Begin).unwrap();
        assert!(s.needs_flush(StateChange::Matrix));
        assert!(s.needs_flush(StateChange::Blend));
        assert_eq!(s.transition(StateChange::Color), Ok(Action::Apply));
    }
}
