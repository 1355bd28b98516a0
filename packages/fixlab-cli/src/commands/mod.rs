pub mod info;
pub mod options;
pub mod run;
pub mod validate;
