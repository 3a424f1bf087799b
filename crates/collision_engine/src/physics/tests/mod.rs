//! Whole-tick collision scenarios

mod collision_scenarios;
