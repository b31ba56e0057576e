//! Property-based unit tests for the graph compiler and retry arithmetic.

mod graph_props;
mod retry_props;
