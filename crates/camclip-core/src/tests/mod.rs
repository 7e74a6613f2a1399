mod capture;
mod orchestrator;
mod support;
