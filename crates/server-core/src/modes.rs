//! Game mode table, grounded on `internal/gamemodes.go`: a fixed small set of
//! modes, each getting its own matchmaker at startup.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Mode {
    Classic = 1,
    Ranked = 2,
    Casual = 3,
    Custom = 4,
}

pub const ALL_MODES: [Mode; 4] = [Mode::Classic, Mode::Ranked, Mode::Casual, Mode::Custom];

impl Mode {
    pub fn from_code(code: u16) -> Option<Mode> {
        match code {
            1 => Some(Mode::Classic),
            2 => Some(Mode::Ranked),
            3 => Some(Mode::Casual),
            4 => Some(Mode::Custom),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Classic => "Classic",
            Mode::Ranked => "Ranked",
            Mode::Casual => "Casual",
            Mode::Custom => "Custom",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_code_round_trips_all_modes() {
        for mode in ALL_MODES {
            assert_eq!(Mode::from_code(mode.code()), Some(mode));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(Mode::from_code(99), None);
    }
}
