pub const SUCCESS: i32 = 0;
/// Missing or malformed inputs, or a failed precondition
pub const INPUT_ERROR: i32 = 1;
/// Failure while processing or writing results
pub const EXECUTION_ERROR: i32 = 2;
