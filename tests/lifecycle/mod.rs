//! Step definitions and scenarios for the instance lifecycle.

mod bdd_steps;
mod scenarios;
mod test_helpers;
