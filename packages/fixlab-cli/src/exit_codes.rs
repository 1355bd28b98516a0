pub const SUCCESS: i32 = 0;
pub const INPUT_ERROR: i32 = 1;
pub const DETECTOR_NOT_FOUND: i32 = 2;
pub const EXECUTION_ERROR: i32 = 3;
/// Some sessions were skipped after detector failures
pub const PARTIAL_FAILURE: i32 = 4;
