//! Framing for the pigpio daemon's socket interface.
//!
//! Every request is four little-endian 32-bit words `cmd, p1, p2, p3`. The reply repeats
//! the first three words and carries the signed result in the fourth; negative values are
//! pigpio error codes.

/// Start servo pulses on a GPIO. `p1` is the GPIO, `p2` the pulse width in microseconds.
pub const PI_CMD_SERVO: u32 = 8;

pub const FRAME_LEN: usize = 16;

pub fn encode_servo(gpio: u32, pulse_us: u32) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    for (i, word) in [PI_CMD_SERVO, gpio, pulse_us, 0].into_iter().enumerate() {
        frame[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    frame
}

/// The result word of a reply.
pub fn decode_response(frame: &[u8; FRAME_LEN]) -> i32 {
    i32::from_le_bytes([frame[12], frame[13], frame[14], frame[15]])
}
