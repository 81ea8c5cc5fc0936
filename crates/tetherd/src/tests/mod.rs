//! Test suites for the host runtime, bootstrap, transport and end-to-end
//! dispatch.

mod behaviour;
pub(crate) mod support;
