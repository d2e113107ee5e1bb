//! Failure policy for the processing pipeline.
//!
//! Every component returns `Result`; this table decides, per stage, whether a
//! failure ends the run or is logged and replaced by a neutral value.
//!
//! | Stage        | Disposition | Substitute                         |
//! |--------------|-------------|------------------------------------|
//! | Open         | escalate    |                                    |
//! | Classify     | absorb      | page counts as 0 characters        |
//! | Extract      | absorb      | empty text                         |
//! | Translate    | absorb      | original text                      |
//! | Overlay      | absorb      | page keeps no / partial overlay    |
//! | Save         | escalate    |                                    |
//! | FormFill     | absorb      | translated-only output is kept     |
//! | FillDataLoad | absorb      | empty fill data                    |

use std::fmt;

use tracing::{error, warn};

use crate::error::Result;

/// A step of the pipeline that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Open,
    Classify,
    Extract,
    Translate,
    Overlay,
    Save,
    FormFill,
    FillDataLoad,
}

/// What happens to a failure in a given stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log and continue with a substitute value
    Absorb,
    /// Log and fail the whole run
    Escalate,
}

impl Stage {
    pub const ALL: [Self; 8] = [
        Self::Open,
        Self::Classify,
        Self::Extract,
        Self::Translate,
        Self::Overlay,
        Self::Save,
        Self::FormFill,
        Self::FillDataLoad,
    ];

    pub const fn disposition(self) -> Disposition {
        match self {
            Self::Open | Self::Save => Disposition::Escalate,
            Self::Classify
            | Self::Extract
            | Self::Translate
            | Self::Overlay
            | Self::FormFill
            | Self::FillDataLoad => Disposition::Absorb,
        }
    }

    pub const fn is_fatal(self) -> bool {
        matches!(self.disposition(), Disposition::Escalate)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Classify => "classify",
            Self::Extract => "extract",
            Self::Translate => "translate",
            Self::Overlay => "overlay",
            Self::Save => "save",
            Self::FormFill => "form-fill",
            Self::FillDataLoad => "fill-data",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply the stage's disposition to a result.
///
/// - `Ok(v)` becomes `Ok(Some(v))`.
/// - An absorbed failure is logged as a warning and becomes `Ok(None)`; the
///   caller substitutes its neutral value.
/// - An escalated failure is logged as an error and returned.
///
/// `context` names what was being worked on (page, field, path).
pub fn settle<T>(stage: Stage, context: impl fmt::Display, result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => match stage.disposition() {
            Disposition::Absorb => {
                warn!(stage = stage.as_str(), "{}: {} ({})", stage, e, context);
                Ok(None)
            }
            Disposition::Escalate => {
                error!(stage = stage.as_str(), "{}: {} ({})", stage, e, context);
                Err(e)
            }
        },
    }
}

/// Like [`settle`] for absorbing stages where the caller has a substitute ready.
pub fn settle_or<T>(
    stage: Stage,
    context: impl fmt::Display,
    result: Result<T>,
    substitute: impl FnOnce() -> T,
) -> Result<T> {
    settle(stage, context, result).map(|value| value.unwrap_or_else(substitute))
}

/// For escalating stages: log a failure as an error and hand it back.
pub fn escalate<T>(stage: Stage, context: impl fmt::Display, result: Result<T>) -> Result<T> {
    debug_assert!(stage.is_fatal(), "{stage} does not escalate");
    result.inspect_err(|e| error!(stage = stage.as_str(), "{}: {} ({})", stage, e, context))
}

/// `Display` helper naming a page in 1-based form for log context
#[derive(Debug, Clone, Copy)]
pub struct PageLabel(pub usize);

impl fmt::Display for PageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0 + 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_only_open_and_save_escalate() {
        let fatal: Vec<Stage> = Stage::ALL.into_iter().filter(|s| s.is_fatal()).collect();
        assert_eq!(fatal, vec![Stage::Open, Stage::Save]);
    }

    #[test]
    fn test_settle_passes_success_through() {
        let value = settle(Stage::Open, "input.pdf", Ok(7)).unwrap();
        assert_eq!(value, Some(7));
    }

    #[test]
    fn test_settle_absorbs_extract_failure() {
        let result: Result<String> = Err(Error::Ocr("tesseract missing".to_string()));
        let settled = settle(Stage::Extract, PageLabel(0), result).unwrap();
        assert!(settled.is_none());
    }

    #[test]
    fn test_settle_escalates_save_failure() {
        let result: Result<()> = Err(Error::PdfSave("disk full".to_string()));
        let settled = settle(Stage::Save, "out.pdf", result);
        assert!(matches!(settled, Err(Error::PdfSave(_))));
    }

    #[test]
    fn test_settle_or_substitutes() {
        let result: Result<String> = Err(Error::TranslationExhausted { attempted: 2 });
        let text = settle_or(Stage::Translate, PageLabel(3), result, || "original".to_string())
            .unwrap();
        assert_eq!(text, "original");
    }

    #[test]
    fn test_escalate_returns_failure() {
        let result: Result<()> = Err(Error::PdfOpen("not a PDF".to_string()));
        assert!(matches!(escalate(Stage::Open, "in.pdf", result), Err(Error::PdfOpen(_))));
        assert_eq!(escalate(Stage::Save, "out.pdf", Ok(3)).unwrap(), 3);
    }

    #[test]
    fn test_page_label_is_one_based() {
        assert_eq!(PageLabel(0).to_string(), "page 1");
        assert_eq!(PageLabel(9).to_string(), "page 10");
    }
}
