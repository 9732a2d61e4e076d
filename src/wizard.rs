//! Step tracker shown above the booking wizard.

use crate::booking::BookingStage;

/// The three visible wizard steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardStep {
    LoadDetails,
    FareEstimate,
    ConfirmationTracking,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [
        WizardStep::LoadDetails,
        WizardStep::FareEstimate,
        WizardStep::ConfirmationTracking,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::LoadDetails => "Load Details",
            WizardStep::FareEstimate => "Fare Estimate",
            WizardStep::ConfirmationTracking => "Confirmation & Tracking",
        }
    }
}

/// Wizard position derived from the booking stage.
#[derive(Clone, Debug)]
pub struct WizardState {
    pub stage: BookingStage,
    pub total_steps: usize,
}

impl WizardState {
    pub fn new() -> Self {
        Self::for_stage(BookingStage::CollectingDetails)
    }

    pub fn for_stage(stage: BookingStage) -> Self {
        Self {
            stage,
            total_steps: WizardStep::ALL.len(),
        }
    }

    pub fn current_step(&self) -> WizardStep {
        WizardStep::ALL[self.stage.step_index()]
    }

    /// 1-based.
    pub fn get_step_number(&self) -> usize {
        self.stage.step_index() + 1
    }

    /// Steps before the current one count as done.
    pub fn is_done(&self, step: WizardStep) -> bool {
        let idx = WizardStep::ALL.iter().position(|s| *s == step).unwrap_or(0);
        idx < self.stage.step_index() || self.stage == BookingStage::Delivered
    }

    /// One-line guidance for the current stage.
    pub fn get_prompt(&self) -> &'static str {
        match self.stage {
            BookingStage::CollectingDetails => {
                "Describe your load, then request a fare estimate."
            }
            BookingStage::Quoted => "Review the fare. Confirm before the quote expires.",
            BookingStage::Confirming => "Finding a driver near the pickup point...",
            BookingStage::InTransit => "Your shipment is on the way.",
            BookingStage::Delivered => "Delivered. Book another load whenever you are ready.",
        }
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}
