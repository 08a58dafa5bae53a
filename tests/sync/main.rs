// Test module entry point for sync tests

mod common;

mod compare_props;
mod operator_tests;
mod transfer_tests;
