//! Test helpers shared by runtime unit tests.
