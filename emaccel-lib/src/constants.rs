// Protocol constants for the accelerator controller

/// Fixed serial line speed
pub const BAUD_RATE: u32 = 115_200;

/// Number of toggleable base lines
pub const BASE_COUNT: usize = 6;

/// Ack: recording started
pub const TOKEN_START_SUCCESS: &str = "sls";

/// Ack: recording stopped. Also terminates a capture stream.
pub const TOKEN_STOP_FINISHED: &str = "slf";

/// Ack: base bitmap applied
pub const TOKEN_BASES_SET: &str = "sb";

/// Probe reply that means no compatible device is listening
pub const TOKEN_PING_FAILURE: &str = "sPingTest";

/// Acknowledgement delimiter
pub const ACK_DELIMITER: &[u8] = b"\r\n";

/// Duration sent with the `l` command to stop a recording
pub const STOP_DURATION: i64 = -1;

/// Leading framing bytes on every capture line
pub const LINE_PREFIX_LEN: usize = 2;

/// Trailing framing bytes on every capture line
pub const LINE_SUFFIX_LEN: usize = 1;

/// Shortest capture line that can hold states, comma and one timestamp digit
pub const MIN_LINE_LEN: usize = LINE_PREFIX_LEN + BASE_COUNT + 1 + 1 + LINE_SUFFIX_LEN;

/// Column labels of an exported result table
pub const EXPORT_HEADER: [&str; BASE_COUNT + 1] = [
    "time / µs",
    "accelerator 1",
    "accelerator 2",
    "accelerator 3",
    "accelerator 4",
    "accelerator 5",
    "accelerator 6",
];
