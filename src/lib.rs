#![warn(missing_docs)]

//! # Span-Scaled PID Controller Library
//!
//! This library provides a PID (Proportional-Integral-Derivative) controller for embedded
//! feedback loops, where a timer or scheduler invokes the controller once per fixed sample
//! interval and the returned command is written to an actuator.
//!
//! ## Features
//!
//! - Works in percent-of-span units: the setpoint and process value are scaled by a configurable
//!   input range and the output by a configurable output range, so that tunings are independent
//!   of engineering units.
//! - Respects the best practices for PID control:
//!   - Validated tunings, ranges and sample interval; invalid values are rejected with an error
//!     and leave the controller untouched.
//!   - Anti reset-windup: the error is not integrated while the output is pinned at the limit it
//!     pushes towards.
//!   - Derivative on measurement to avoid derivative kick.
//!   - Bumpless transfer from manual to automatic control, and bumpless re-tuning.
//!   - Optional feed-forward bias.
//! - No clock: the sample interval is a nominal period. Driving `compute` at that cadence is the
//!   caller's job.
//! - Lock-free publication of the latest output to other execution contexts via
//!   [`shared::OutputCell`].
//!
//! ## Usage
//!
//! ```rust
//! use core::time::Duration;
//!
//! use span_pid::pid::{Controller, Mode};
//!
//! // Kc = 2, no integral or derivative action, computed every second
//! let mut pid = Controller::<f64>::new(2.0, 0.0, 0.0, Duration::from_secs(1))
//!     .expect("Invalid PID tunings");
//! assert!(pid.set_input_limits(0.0, 10.0).is_ok());
//! assert!(pid.set_output_limits(0.0, 10.0).is_ok());
//! pid.set_mode(Mode::Auto);
//!
//! pid.set_setpoint(5.0);
//! pid.set_process_value(0.0);
//!
//! // Half-span error times a gain of 2 saturates the output
//! assert_eq!(pid.compute(), 10.0);
//! ```
//!
//! ### Building from a configuration
//!
//! ```rust
//! use core::time::Duration;
//!
//! use span_pid::pid::{Controller, ControllerConfigBuilder, Mode};
//!
//! let config = ControllerConfigBuilder::default()
//!     .tunings(1.5_f32, 20.0, 0.5)
//!     .sample_interval(Duration::from_millis(100))
//!     .input_limits(0.0, 300.0) // degrees Celsius
//!     .output_limits(0.0, 100.0) // heater duty cycle, percent
//!     .bias(10.0)
//!     .mode(Mode::Auto)
//!     .build()
//!     .expect("Invalid PID config");
//!
//! let mut pid = Controller::from_config(config).expect("Invalid sample interval");
//! pid.set_setpoint(180.0);
//! pid.set_process_value(25.0);
//! let duty = pid.compute();
//! assert!((0.0..=100.0).contains(&duty));
//! ```
//!
//! ## License
//!
//! MIT
#![no_std]

#[cfg(feature = "std")]
extern crate std;

/// The main module for the PID controller.
pub mod pid;

/// Lock-free sharing of the controller output across execution contexts.
pub mod shared;

/// Real-world ranges and their mapping onto the unit interval.
pub mod span;

#[doc(hidden)]
#[cfg(feature = "simulation")]
pub mod sim;

#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
