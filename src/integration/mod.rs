//! End-to-end tests over the router and pipeline with a scripted tool runner

mod e2e;
mod fixtures;
