//! End-to-end tests at the `GraphMatch` run level.
//!
//! Each test file covers a specific scenario, building a small store and a
//! pattern and checking what reaches the sink.

#![cfg(test)]

mod helpers;

mod test_concurrent_compile;
mod test_differential;
mod test_distinct;
mod test_early_stop;
mod test_explanation;
mod test_fan_out_guard;
mod test_full_scan;
mod test_ground_facts;
mod test_knows;
mod test_multiply_bound;
mod test_optional;
mod test_query_as_data;
mod test_result_window;
mod test_row_serialization;
mod test_store_errors;
mod test_value_filters;
