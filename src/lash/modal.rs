// Absolute/incremental positioning mode (G90/G91)

/// Positioning mode the controller interprets coordinates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Positioning {
    /// G90
    #[default]
    Absolute,
    /// G91
    Incremental,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalState {
    positioning: Positioning,
}

impl ModalState {
    /// Starts in absolute mode
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_absolute(&mut self) {
        self.positioning = Positioning::Absolute;
    }

    pub fn set_incremental(&mut self) {
        self.positioning = Positioning::Incremental;
    }

    pub fn is_absolute(&self) -> bool {
        self.positioning == Positioning::Absolute
    }

    pub fn positioning(&self) -> Positioning {
        self.positioning
    }
}
