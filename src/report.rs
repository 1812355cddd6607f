use crate::capability::StenosisResult;

/// Clinical severity grading of a stenosis measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StenosisSeverity {
    Mild,
    Moderate,
    Significant,
    Severe,
}

impl StenosisSeverity {
    /// Grades the worse of the two sides: below 30% is mild, below
    /// 50% moderate, below 70% significant, anything else severe.
    pub fn from_percentages(left: f64, right: f64) -> Self {
        let worst = left.max(right);
        if worst < 30.0 {
            StenosisSeverity::Mild
        } else if worst < 50.0 {
            StenosisSeverity::Moderate
        } else if worst < 70.0 {
            StenosisSeverity::Significant
        } else {
            StenosisSeverity::Severe
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StenosisSeverity::Mild => "Mild",
            StenosisSeverity::Moderate => "Moderate",
            StenosisSeverity::Significant => "Significant",
            StenosisSeverity::Severe => "Severe",
        }
    }

    /// Short advisory line shown alongside the grade.
    pub fn advice(self) -> &'static str {
        match self {
            StenosisSeverity::Mild => "routine surveillance recommended",
            StenosisSeverity::Moderate => "medical consultation advised",
            StenosisSeverity::Significant => "intervention may be required",
            StenosisSeverity::Severe => "urgent medical attention required",
        }
    }
}

/// Successful detection response paired with its severity grading.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub result: StenosisResult,
    pub severity: StenosisSeverity,
}

impl DetectionOutcome {
    pub fn new(result: StenosisResult) -> Self {
        let severity = StenosisSeverity::from_percentages(
            result.stenosis_left_percent,
            result.stenosis_right_percent,
        );
        Self { result, severity }
    }

    /// Plain-text summary in the shape the review UI displays.
    pub fn summary(&self) -> String {
        format!(
            "Images processed: {}\nLeft carotid: {:.2}%\nRight carotid: {:.2}%\n{}: {}",
            self.result.processed_images,
            self.result.stenosis_left_percent,
            self.result.stenosis_right_percent,
            self.severity.label(),
            self.severity.advice(),
        )
    }
}
