//! Scenario tests over the mock chain

mod trade_flow_tests;
