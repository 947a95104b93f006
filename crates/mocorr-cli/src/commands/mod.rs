pub mod config;
pub mod correct;
pub mod info;
pub mod synth;
