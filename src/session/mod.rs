//! Running complete calibration sequences from a plan.

mod plan;

pub use plan::{run_session, PlanError, SessionError, SessionPlan};
