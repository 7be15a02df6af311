//! Named output sizes for variant export.
//!
//! | Key | Size | Suffix | Fit |
//! |---|---|---|---|
//! | `thumbnail` | 200×200 | `-thumbnail` | inside |
//! | `small` | 400×400 | `-small` | inside |
//! | `medium` | 800×800 | `-medium` | inside |
//! | `large` | 1200×1200 | `-large` | inside |
//! | `og` | 1200×630 | `-og` | cover |

use crate::imaging::FitMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePreset {
    pub key: &'static str,
    pub width: u32,
    pub height: u32,
    pub suffix: &'static str,
    /// `None` means the exporter default (`inside`).
    pub fit: Option<FitMode>,
}

pub const PRESETS: &[SizePreset] = &[
    SizePreset {
        key: "thumbnail",
        width: 200,
        height: 200,
        suffix: "-thumbnail",
        fit: None,
    },
    SizePreset {
        key: "small",
        width: 400,
        height: 400,
        suffix: "-small",
        fit: None,
    },
    SizePreset {
        key: "medium",
        width: 800,
        height: 800,
        suffix: "-medium",
        fit: None,
    },
    SizePreset {
        key: "large",
        width: 1200,
        height: 1200,
        suffix: "-large",
        fit: None,
    },
    SizePreset {
        key: "og",
        width: 1200,
        height: 630,
        suffix: "-og",
        fit: Some(FitMode::Cover),
    },
];

/// Look up a preset by key. Unknown keys return `None`.
pub fn lookup(key: &str) -> Option<&'static SizePreset> {
    PRESETS.iter().find(|p| p.key == key)
}
