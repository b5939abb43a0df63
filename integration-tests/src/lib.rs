//! Integration test harness; see tests/ for the actual scenarios.
