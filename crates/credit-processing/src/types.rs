use serde::{Deserialize, Serialize};

/// The two pipeline modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Training: clean, fit and persist state, then apply it.
    Fit,
    /// Inference: apply persisted state only.
    Transform,
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fit => write!(f, "fit"),
            Self::Transform => write!(f, "transform"),
        }
    }
}

// ============================================================================
// Pipeline Summary Types
// ============================================================================

/// Human-readable summary of what one pipeline run did.
///
/// Serialized by the CLI next to its output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub mode: PipelineMode,

    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    /// Row count. No pipeline step adds or removes rows.
    pub rows: usize,

    pub columns_before: usize,
    pub columns_after: usize,

    /// Actions taken, in execution order.
    pub actions: Vec<PipelineAction>,

    /// Free-form step log collected from every component.
    pub processing_steps: Vec<String>,
}

impl PipelineSummary {
    pub fn new(mode: PipelineMode, rows: usize, columns_before: usize) -> Self {
        Self {
            mode,
            duration_ms: 0,
            rows,
            columns_before,
            columns_after: columns_before,
            actions: Vec::new(),
            processing_steps: Vec::new(),
        }
    }

    /// Add an action to the summary.
    pub fn add_action(&mut self, action: PipelineAction) {
        self.actions.push(action);
    }

    /// Number of actions of a given type.
    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }
}

/// A single action taken during a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineAction {
    pub action_type: ActionType,
    /// Column name, or "dataset".
    pub target: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl PipelineAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions the pipeline records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Currency strings were parsed into floats.
    CurrencyParsed,
    /// Missing values were imputed.
    ValueImputed,
    /// Free-text values were snapped onto a canonical vocabulary.
    CategoryCorrected,
    /// Out-of-range values were replaced.
    OutlierHandled,
    /// A derived column was added.
    FeatureDerived,
    /// Numeric columns were standardized.
    DataNormalized,
    /// Categories were encoded.
    CategoriesEncoded,
}

impl ActionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CurrencyParsed => "Currency Parsed",
            Self::ValueImputed => "Value Imputed",
            Self::CategoryCorrected => "Category Corrected",
            Self::OutlierHandled => "Outlier Handled",
            Self::FeatureDerived => "Feature Derived",
            Self::DataNormalized => "Data Normalized",
            Self::CategoriesEncoded => "Categories Encoded",
        }
    }
}
