//! Scenario-based tests for psychodrama

mod controller;
mod phase_ordering;
mod reporting;
mod support_cleanup;
mod teardown;
mod webhook;
