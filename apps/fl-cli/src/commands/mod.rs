pub mod policy;
pub mod run;
pub mod runs;
