mod esc_client;
mod pigpio;

pub use esc_client::{EscBackend, EscClient, EscError};
pub use pigpio::{decode_response, encode_servo, PI_CMD_SERVO};
