//! LED grid simulator.
//!
//! Receives the WLED UDP realtime pixel protocol into a framebuffer with a
//! timeout-based liveness model, and forwards simulated game-controller input
//! as kernel joystick event records to a named pipe. Rendering and input
//! collection are left to an embedding presentation layer; the shipped binary
//! runs the core headless and reports display status through the log.

pub mod config;
pub mod joypad;
pub mod wled;
