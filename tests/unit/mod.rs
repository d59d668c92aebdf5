//! Unit test modules.

mod config_test;
mod factory_validation_test;
mod smoothing_test;
