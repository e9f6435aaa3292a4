//! Trigger identifiers understood by the dispatcher.
//!
//! Alarms, the screen watcher, the CLI and the startup path all hand the
//! dispatcher a string identifier. Parsing it is the only place an unknown
//! trigger can be detected.

use std::fmt;
use std::str::FromStr;

use crate::constants::*;
use crate::error::UnknownActionError;
use crate::time_window::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// The day period begins.
    Day,
    /// The night period begins.
    Night,
    /// The display became actionable again.
    ScreenOn,
    /// The system finished booting; alarms need installing.
    BootCompleted,
}

impl Action {
    /// Parse a full identifier or its short CLI form.
    pub fn parse(id: &str) -> Result<Self, UnknownActionError> {
        match id.trim() {
            ACTION_DAY | "day" => Ok(Action::Day),
            ACTION_NIGHT | "night" => Ok(Action::Night),
            ACTION_SCREEN_ON | "screen-on" => Ok(Action::ScreenOn),
            ACTION_BOOT_COMPLETED | "boot" => Ok(Action::BootCompleted),
            other => Err(UnknownActionError(other.to_string())),
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Action::Day => ACTION_DAY,
            Action::Night => ACTION_NIGHT,
            Action::ScreenOn => ACTION_SCREEN_ON,
            Action::BootCompleted => ACTION_BOOT_COMPLETED,
        }
    }

    /// The period this action applies, if it applies one directly.
    pub fn period(&self) -> Option<Period> {
        match self {
            Action::Day => Some(Period::Day),
            Action::Night => Some(Period::Night),
            Action::ScreenOn | Action::BootCompleted => None,
        }
    }
}

impl From<Period> for Action {
    fn from(period: Period) -> Self {
        match period {
            Period::Day => Action::Day,
            Period::Night => Action::Night,
        }
    }
}

impl FromStr for Action {
    type Err = UnknownActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::parse(s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_identifiers() {
        for action in [Action::Day, Action::Night, Action::ScreenOn, Action::BootCompleted] {
            assert_eq!(Action::parse(action.id()), Ok(action));
        }
    }

    #[test]
    fn test_parse_short_forms() {
        assert_eq!("day".parse::<Action>(), Ok(Action::Day));
        assert_eq!("night".parse::<Action>(), Ok(Action::Night));
        assert_eq!(" screen-on ".parse::<Action>(), Ok(Action::ScreenOn));
        assert_eq!("boot".parse::<Action>(), Ok(Action::BootCompleted));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(
            Action::parse("nightcolors.action.DUSK"),
            Err(UnknownActionError("nightcolors.action.DUSK".to_string()))
        );
        assert!(Action::parse("").is_err());
        // Identifiers are case sensitive
        assert!(Action::parse("Day").is_err());
    }

    #[test]
    fn test_period_mapping() {
        assert_eq!(Action::from(Period::Day).period(), Some(Period::Day));
        assert_eq!(Action::from(Period::Night).period(), Some(Period::Night));
        assert_eq!(Action::ScreenOn.period(), None);
        assert_eq!(Action::BootCompleted.period(), None);
    }
}
