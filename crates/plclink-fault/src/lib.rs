//! Latched fault register for the PLC link.
//!
//! Up to 64 fault codes (1-based) in four 16-bit words. Any thread may
//! set or reset a fault; supervisory clients poll. A fault set and reset
//! between two polls is still reported by the second one. Sticky faults
//! stay set across polls until explicitly reset.
//!
//! ```
//! use plclink_fault::{codes, FaultConfig, FaultRegister};
//!
//! let register = FaultRegister::new(FaultConfig::default()).unwrap();
//! register.set(codes::CHECKSUM_MISMATCH).unwrap();
//! register.reset(codes::CHECKSUM_MISMATCH).unwrap();
//!
//! assert!(register.poll(0).unwrap().contains(codes::CHECKSUM_MISMATCH));
//! assert!(register.poll(0).unwrap().is_empty());
//! ```

pub mod bits;
pub mod codes;
pub mod error;
pub mod register;

pub use bits::{is_valid_code, FaultBits, FAULT_WORDS, MAX_FAULT_CODE, WORD_BITS};
pub use codes::fault_name;
pub use error::{ConfigError, FaultError, Result};
pub use register::{FaultConfig, FaultRegister};
