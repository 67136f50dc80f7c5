//! Deployment unit tests

mod fakes;
mod test_run;
