//! Per-frame input handed to behaviors
//!
//! Device polling happens outside the simulation; each frame receives an
//! immutable snapshot of which buttons are held now and which were held on
//! the previous frame, so edge detection needs no hidden state.

use serde::{Deserialize, Serialize};

use crate::core::types::Frame;

/// Logical buttons behaviors react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Attack,
}

impl Button {
    #[inline]
    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of held buttons
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonSet(u8);

impl ButtonSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, button: Button) -> Self {
        self.insert(button);
        self
    }

    pub fn insert(&mut self, button: Button) {
        self.0 |= button.bit();
    }

    pub fn remove(&mut self, button: Button) {
        self.0 &= !button.bit();
    }

    pub fn contains(&self, button: Button) -> bool {
        self.0 & button.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Button> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = Button>>(iter: I) -> Self {
        iter.into_iter().fold(ButtonSet::new(), ButtonSet::with)
    }
}

/// Buttons held this frame and the frame before
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    held: ButtonSet,
    previous: ButtonSet,
}

impl InputSnapshot {
    pub fn new(held: ButtonSet, previous: ButtonSet) -> Self {
        Self { held, previous }
    }

    /// Nothing held now or before
    pub fn idle() -> Self {
        Self::default()
    }

    /// Snapshot for the following frame: this frame's buttons become the
    /// previous ones
    pub fn advance(&self, held: ButtonSet) -> Self {
        Self {
            held,
            previous: self.held,
        }
    }

    pub fn held(&self) -> ButtonSet {
        self.held
    }

    pub fn is_down(&self, button: Button) -> bool {
        self.held.contains(button)
    }

    /// Went down this frame
    pub fn pressed(&self, button: Button) -> bool {
        self.held.contains(button) && !self.previous.contains(button)
    }

    /// Went up this frame
    pub fn released(&self, button: Button) -> bool {
        !self.held.contains(button) && self.previous.contains(button)
    }

    /// -1, 0 or 1 from the left/right buttons
    pub fn horizontal(&self) -> f32 {
        let mut movement = 0.0;
        if self.is_down(Button::Left) {
            movement -= 1.0;
        }
        if self.is_down(Button::Right) {
            movement += 1.0;
        }
        movement
    }
}

/// Everything the environment provides for one simulation frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub frame: Frame,
    /// Seconds simulated by this frame
    pub delta: f32,
    pub input: InputSnapshot,
}

impl FrameInput {
    pub fn new(frame: Frame, delta: f32) -> Self {
        Self {
            frame,
            delta,
            input: InputSnapshot::idle(),
        }
    }

    pub fn with_input(mut self, input: InputSnapshot) -> Self {
        self.input = input;
        self
    }
}
