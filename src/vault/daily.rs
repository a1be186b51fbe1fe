//! Daily-note skip predicate

use chrono::NaiveDate;

use crate::backlinks::matcher::file_stem;
use crate::settings::Settings;
use crate::view::host::SkipPredicate;

/// Default daily-note file name format
pub const DAILY_NOTE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyNoteMode {
    /// Skip nothing
    Off,
    /// Views only on daily notes
    OnlyDaily,
    /// No views on daily notes
    ExcludeDaily,
}

#[derive(Debug, Clone)]
pub struct DailyNoteSkip {
    mode: DailyNoteMode,
    format: String,
}

impl DailyNoteSkip {
    pub fn new(mode: DailyNoteMode) -> Self {
        Self { mode, format: DAILY_NOTE_FORMAT.to_string() }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn from_settings(settings: &Settings) -> Self {
        if settings.only_daily_notes {
            Self::new(DailyNoteMode::OnlyDaily)
        } else {
            Self::new(DailyNoteMode::Off)
        }
    }

    pub fn is_daily_note(&self, path: &str) -> bool {
        NaiveDate::parse_from_str(file_stem(path), &self.format).is_ok()
    }
}

impl SkipPredicate for DailyNoteSkip {
    fn should_skip(&self, path: &str) -> bool {
        match self.mode {
            DailyNoteMode::Off => false,
            DailyNoteMode::OnlyDaily => !self.is_daily_note(path),
            DailyNoteMode::ExcludeDaily => self.is_daily_note(path),
        }
    }
}
