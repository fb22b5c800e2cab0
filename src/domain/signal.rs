//! Tri-state position and entry/exit signal derivation.

use std::fmt;

/// Desired market state at one time step.
///
/// `Undefined` marks rows without statistics and the three-state dead band; it
/// is never compared against a defined position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Long,
    Flat,
    #[default]
    Undefined,
}

impl Position {
    pub fn is_defined(self) -> bool {
        self != Position::Undefined
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Long => write!(f, "long"),
            Position::Flat => write!(f, "flat"),
            Position::Undefined => write!(f, "undefined"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    Enter,
    Exit,
    #[default]
    None,
}

impl Signal {
    /// +1 / -1 / 0
    pub fn delta(self) -> i8 {
        match self {
            Signal::Enter => 1,
            Signal::Exit => -1,
            Signal::None => 0,
        }
    }
}

/// One signal per position. A signal fires where a defined position differs from
/// the last defined position before it; undefined rows are skipped, and the first
/// defined row never fires.
pub fn derive_signals(positions: &[Position]) -> Vec<Signal> {
    let mut last_defined: Option<Position> = None;

    positions
        .iter()
        .map(|&position| {
            if !position.is_defined() {
                return Signal::None;
            }
            let signal = match (last_defined, position) {
                (Some(Position::Flat), Position::Long) => Signal::Enter,
                (Some(Position::Long), Position::Flat) => Signal::Exit,
                _ => Signal::None,
            };
            last_defined = Some(position);
            signal
        })
        .collect()
}
