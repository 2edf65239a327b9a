pub mod common;

mod event_adapters;
mod token_single_flight;
