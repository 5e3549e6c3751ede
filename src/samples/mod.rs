// Sample workflows wired end to end: entity, model, service

pub mod holiday;
pub mod stepper;

pub use holiday::{holiday_model, Holiday, HolidayService, HolidayViewModel};
pub use stepper::{stepper_model, Stepper, StepperService, StepperViewModel};

use crate::workflows::{ConfigurationError, WorkflowRegistry};

/// Registry with every sample workflow registered.
pub fn default_registry() -> Result<WorkflowRegistry, ConfigurationError> {
    WorkflowRegistry::new()
        .with_model(holiday_model()?)?
        .with_model(stepper_model()?)
}
