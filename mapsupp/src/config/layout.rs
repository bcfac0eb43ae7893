//! Style layout selection.

use std::fmt;

/// The style layout families shipped with OpenMTBMap downloads.
///
/// Each layout selects the first `*.TYP` file in the working directory whose
/// name starts with the layout prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// `clas*.TYP` - classic layout, optimized for Vista/Legend series.
    Clas,
    /// `thin*.TYP` - thinner tracks and paths, optimized for Gpsmap60/76 series.
    #[default]
    Thin,
    /// `wide*.TYP` - high contrast layout with white forest, for Oregon/Colorado displays.
    Wide,
    /// `trad*.TYP` - big screen layout, not meant for GPS devices.
    Trad,
}

impl Layout {
    /// The filename prefix this layout selects.
    pub fn prefix(&self) -> &'static str {
        match self {
            Layout::Clas => "clas",
            Layout::Thin => "thin",
            Layout::Wide => "wide",
            Layout::Trad => "trad",
        }
    }

    /// Glob matching the style files of this layout, e.g. `thin*.TYP`.
    ///
    /// Matching is case-sensitive; the uppercase `.TYP` extension is part of
    /// the download convention.
    pub fn style_pattern(&self) -> String {
        format!("{}*.TYP", self.prefix())
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_thin() {
        assert_eq!(Layout::default(), Layout::Thin);
    }

    #[test]
    fn test_style_patterns() {
        assert_eq!(Layout::Clas.style_pattern(), "clas*.TYP");
        assert_eq!(Layout::Thin.style_pattern(), "thin*.TYP");
        assert_eq!(Layout::Wide.style_pattern(), "wide*.TYP");
        assert_eq!(Layout::Trad.style_pattern(), "trad*.TYP");
    }

    #[test]
    fn test_display_matches_prefix() {
        assert_eq!(Layout::Wide.to_string(), "wide");
    }
}
