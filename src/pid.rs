use core::fmt::Debug;
use core::time::Duration;

use log::{debug, warn};
use num_traits::float::FloatCore;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::shared::{AtomicFloat, OutputCell};
use crate::span::{clamp_unit, Span};

/// Default real-world bound of both the input and output ranges, i.e. a 0-3.3V ADC/DAC.
/// Applications should set ranges matching their sensor and actuator.
pub const DEFAULT_FULL_SCALE: f64 = 3.3;

/// Reasons a configuration call is rejected. A rejected call never changes controller state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum ConfigError {
    /// The controller gain is zero or not finite.
    #[cfg_attr(feature = "std", error("controller gain must be non-zero and finite"))]
    InvalidProportionalGain,

    /// The integral time is negative or not finite.
    #[cfg_attr(feature = "std", error("integral time must be non-negative and finite"))]
    InvalidIntegralTime,

    /// The derivative time is negative or not finite.
    #[cfg_attr(feature = "std", error("derivative time must be non-negative and finite"))]
    InvalidDerivativeTime,

    /// The sample interval is zero or not representable.
    #[cfg_attr(feature = "std", error("sample interval must be positive"))]
    InvalidSampleInterval,

    /// The input range is empty, inverted or not finite.
    #[cfg_attr(feature = "std", error("input limits must be finite with min < max"))]
    InvalidInputLimits,

    /// The output range is empty, inverted or not finite.
    #[cfg_attr(feature = "std", error("output limits must be finite with min < max"))]
    InvalidOutputLimits,
}

/// Operating mode of the controller.
///
/// The mode does not gate [`Controller::compute`]; it only decides whether entering automatic
/// control re-synchronizes the internal state. While in `Manual`, the caller is responsible for
/// not driving the actuator with the computed output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// The actuator is driven by something other than this controller.
    #[default]
    Manual,
    /// The controller output drives the actuator.
    Auto,
}

fn validate_tunings<F: FloatCore>(kc: F, tau_i: F, tau_d: F) -> Result<(), ConfigError> {
    if kc == F::zero() || !kc.is_finite() {
        return Err(ConfigError::InvalidProportionalGain);
    }
    if tau_i < F::zero() || !tau_i.is_finite() {
        return Err(ConfigError::InvalidIntegralTime);
    }
    if tau_d < F::zero() || !tau_d.is_finite() {
        return Err(ConfigError::InvalidDerivativeTime);
    }
    Ok(())
}

fn interval_secs<F: FloatCore>(interval: Duration) -> Result<F, ConfigError> {
    if interval.is_zero() {
        return Err(ConfigError::InvalidSampleInterval);
    }
    F::from(interval.as_secs_f64())
        .filter(|secs| secs.is_finite() && *secs > F::zero())
        .ok_or(ConfigError::InvalidSampleInterval)
}

/// Integral rate per sample: `interval / tau_i`, or zero when integral action is disabled.
fn integral_rate<F: FloatCore>(tau_i: F, interval: F) -> F {
    if tau_i == F::zero() {
        F::zero()
    } else {
        (F::one() / tau_i) * interval
    }
}

fn default_span<F: FloatCore>() -> Span<F> {
    let full_scale = F::from(DEFAULT_FULL_SCALE).unwrap_or_else(F::one);
    Span::new(F::zero(), full_scale).unwrap_or_else(Span::unit)
}

/// A validated set of parameters from which a [`Controller`] is built.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ControllerConfig<F> {
    /// Controller gain. Defaults to 1.0. Negative gains give a reverse-acting controller.
    kc: F,

    /// Integral time in seconds. Defaults to 0.0, i.e. no integral action.
    tau_i: F,

    /// Derivative time in seconds. Defaults to 0.0.
    tau_d: F,

    /// Nominal period between calls to `compute`. Defaults to 10ms.
    sample_interval: Duration,

    /// Real-world range of the setpoint and process value. Defaults to [0, 3.3].
    input_limits: Span<F>,

    /// Real-world range of the output. Defaults to [0, 3.3].
    output_limits: Span<F>,

    /// Feed-forward bias; feed-forward is enabled iff this is set. Defaults to `None`.
    bias: Option<F>,

    /// Mode the controller starts in. Defaults to `Manual`.
    mode: Mode,
}

impl<F: FloatCore> Default for ControllerConfig<F> {
    fn default() -> Self {
        Self {
            kc: F::one(),
            tau_i: F::zero(),
            tau_d: F::zero(),
            sample_interval: Duration::from_millis(10),
            input_limits: default_span(),
            output_limits: default_span(),
            bias: None,
            mode: Mode::Manual,
        }
    }
}

impl<F: FloatCore> ControllerConfig<F> {
    /// Returns the controller gain.
    pub fn kc(&self) -> F {
        self.kc
    }

    /// Returns the integral time.
    pub fn tau_i(&self) -> F {
        self.tau_i
    }

    /// Returns the derivative time.
    pub fn tau_d(&self) -> F {
        self.tau_d
    }

    /// Returns the nominal sample interval.
    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    /// Returns the input range.
    pub fn input_limits(&self) -> Span<F> {
        self.input_limits
    }

    /// Returns the output range.
    pub fn output_limits(&self) -> Span<F> {
        self.output_limits
    }

    /// Returns the feed-forward bias, if any.
    pub fn bias(&self) -> Option<F> {
        self.bias
    }

    /// Returns the initial mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }
}

// A deserialized configuration is held to the same checks as `ControllerConfigBuilder::build`
#[cfg(feature = "serde")]
impl<'de, F: FloatCore + Deserialize<'de>> Deserialize<'de> for ControllerConfig<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(bound(deserialize = "F: FloatCore + Deserialize<'de>"))]
        struct Fields<F> {
            kc: F,
            tau_i: F,
            tau_d: F,
            sample_interval: Duration,
            input_limits: Span<F>,
            output_limits: Span<F>,
            bias: Option<F>,
            mode: Mode,
        }

        let fields = Fields::<F>::deserialize(deserializer)?;
        validate_tunings(fields.kc, fields.tau_i, fields.tau_d)
            .and_then(|_| interval_secs::<F>(fields.sample_interval))
            .map_err(|err| {
                <D::Error as de::Error>::custom(format_args!("invalid controller config: {err:?}"))
            })?;

        Ok(ControllerConfig {
            kc: fields.kc,
            tau_i: fields.tau_i,
            tau_d: fields.tau_d,
            sample_interval: fields.sample_interval,
            input_limits: fields.input_limits,
            output_limits: fields.output_limits,
            bias: fields.bias,
            mode: fields.mode,
        })
    }
}

/// Builder for [`ControllerConfig`]. Validation is deferred to [`ControllerConfigBuilder::build`].
#[derive(Copy, Clone, Debug)]
pub struct ControllerConfigBuilder<F> {
    kc: F,
    tau_i: F,
    tau_d: F,
    sample_interval: Duration,
    input_limits: (F, F),
    output_limits: (F, F),
    bias: Option<F>,
    mode: Mode,
}

impl<F: FloatCore> Default for ControllerConfigBuilder<F> {
    fn default() -> Self {
        let config = ControllerConfig::<F>::default();
        Self {
            kc: config.kc,
            tau_i: config.tau_i,
            tau_d: config.tau_d,
            sample_interval: config.sample_interval,
            input_limits: (config.input_limits.min(), config.input_limits.max()),
            output_limits: (config.output_limits.min(), config.output_limits.max()),
            bias: None,
            mode: config.mode,
        }
    }
}

impl<F: FloatCore> ControllerConfigBuilder<F> {
    /// Sets the controller gain.
    pub fn kc(mut self, kc: F) -> Self {
        self.kc = kc;
        self
    }

    /// Sets the integral time in seconds; zero disables integral action.
    pub fn tau_i(mut self, tau_i: F) -> Self {
        self.tau_i = tau_i;
        self
    }

    /// Sets the derivative time in seconds.
    pub fn tau_d(mut self, tau_d: F) -> Self {
        self.tau_d = tau_d;
        self
    }

    /// Sets gain, integral time and derivative time together.
    pub fn tunings(self, kc: F, tau_i: F, tau_d: F) -> Self {
        self.kc(kc).tau_i(tau_i).tau_d(tau_d)
    }

    /// Sets the nominal sample interval.
    pub fn sample_interval(mut self, sample_interval: Duration) -> Self {
        self.sample_interval = sample_interval;
        self
    }

    /// Sets the real-world input range.
    pub fn input_limits(mut self, min: F, max: F) -> Self {
        self.input_limits = (min, max);
        self
    }

    /// Sets the real-world output range.
    pub fn output_limits(mut self, min: F, max: F) -> Self {
        self.output_limits = (min, max);
        self
    }

    /// Sets a feed-forward bias, enabling feed-forward.
    pub fn bias(mut self, bias: F) -> Self {
        self.bias = Some(bias);
        self
    }

    /// Sets the mode the controller starts in.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Validates the parameters and builds the configuration.
    pub fn build(self) -> Result<ControllerConfig<F>, ConfigError> {
        validate_tunings(self.kc, self.tau_i, self.tau_d)?;
        interval_secs::<F>(self.sample_interval)?;
        let input_limits = Span::new(self.input_limits.0, self.input_limits.1)
            .ok_or(ConfigError::InvalidInputLimits)?;
        let output_limits = Span::new(self.output_limits.0, self.output_limits.1)
            .ok_or(ConfigError::InvalidOutputLimits)?;

        Ok(ControllerConfig {
            kc: self.kc,
            tau_i: self.tau_i,
            tau_d: self.tau_d,
            sample_interval: self.sample_interval,
            input_limits,
            output_limits,
            bias: self.bias,
            mode: self.mode,
        })
    }
}

/// A PID controller working in percent-of-span units.
///
/// The setpoint and process value are scaled into `[0, 1]` by the input range, the output is
/// computed in `[0, 1]` and scaled back out by the output range. The controller features:
///
/// - Integral anti-windup: the error is not accumulated in a direction that would push an output
///   already pinned at a limit further into saturation.
/// - Derivative on measurement, so setpoint steps cause no derivative kick.
/// - Bumpless transfer on the `Manual` to `Auto` transition and bumpless re-tuning in `Auto`.
/// - Optional feed-forward bias.
///
/// The controller never reads a clock. `compute` must be invoked once per sample interval by an
/// external scheduler; the interval is a nominal period used to convert the time constants into
/// per-sample coefficients, and drift in the actual call cadence is not compensated.
#[derive(Clone, Debug)]
pub struct Controller<F> {
    // Raw tuning parameters, handed back on request
    kc: F,
    tau_i: F,
    tau_d: F,

    // Per-sample coefficients used by `compute`
    tau_r: F,
    tau_d_rate: F,

    interval: Duration,
    interval_secs: F,

    input: Span<F>,
    output: Span<F>,

    setpoint: F,
    process_value: F,

    // Normalized to [0, 1]
    prev_process_value: F,
    prev_output: F,
    accumulated_error: F,

    bias: F,
    feed_forward: bool,
    mode: Mode,

    // Real-world output of the last `compute`
    last_output: F,
}

impl<F: FloatCore + Debug> Controller<F> {
    /// Creates a controller with the given tunings and sample interval, the default full-scale
    /// input and output ranges, no feed-forward, in `Manual` mode.
    ///
    /// # Arguments
    /// - `kc`: Controller gain, non-zero.
    /// - `tau_i`: Integral time in seconds, zero disables integral action.
    /// - `tau_d`: Derivative time in seconds.
    /// - `interval`: Nominal period between calls to `compute`.
    pub fn new(kc: F, tau_i: F, tau_d: F, interval: Duration) -> Result<Self, ConfigError> {
        ControllerConfigBuilder::default()
            .tunings(kc, tau_i, tau_d)
            .sample_interval(interval)
            .build()
            .and_then(Self::from_config)
    }

    /// Creates a controller from a configuration. If the configuration requests `Auto` mode, the
    /// controller goes through the usual `Manual` to `Auto` transition.
    ///
    /// Fails with [`ConfigError::InvalidSampleInterval`] if the interval cannot be represented in
    /// `F`; the other parameters were checked when the configuration was built.
    pub fn from_config(config: ControllerConfig<F>) -> Result<Self, ConfigError> {
        let secs = interval_secs(config.sample_interval)?;

        let mut pid = Self {
            kc: config.kc,
            tau_i: config.tau_i,
            tau_d: config.tau_d,
            tau_r: integral_rate(config.tau_i, secs),
            tau_d_rate: config.tau_d / secs,
            interval: config.sample_interval,
            interval_secs: secs,
            input: config.input_limits,
            output: config.output_limits,
            setpoint: F::zero(),
            process_value: F::zero(),
            prev_process_value: F::zero(),
            prev_output: F::zero(),
            accumulated_error: F::zero(),
            bias: F::zero(),
            feed_forward: false,
            mode: Mode::Manual,
            last_output: F::zero(),
        };

        if let Some(bias) = config.bias {
            pid.set_bias(bias);
        }
        pid.set_mode(config.mode);
        Ok(pid)
    }

    /// Sets the real-world input range mapped onto 0-100%.
    ///
    /// The previous process value and the accumulated error are rescaled by the ratio of the new
    /// span to the old one, and the previous process value is clamped back into `[0, 1]`.
    ///
    /// # Returns
    /// - `Err(ConfigError::InvalidInputLimits)` if `min >= max` or either is not finite. Nothing
    ///   is changed in that case.
    pub fn set_input_limits(&mut self, min: F, max: F) -> Result<(), ConfigError> {
        let Some(span) = Span::new(min, max) else {
            warn!("Rejected input limits [{min:?}, {max:?}]");
            return Err(ConfigError::InvalidInputLimits);
        };

        let factor = span.rescale_factor(&self.input);
        self.prev_process_value = clamp_unit(self.prev_process_value * factor);
        self.accumulated_error = self.accumulated_error * factor;
        self.input = span;
        Ok(())
    }

    /// Sets the real-world output range mapped onto 0-100%.
    ///
    /// The previous output is rescaled by the ratio of the new span to the old one and clamped
    /// back into `[0, 1]`.
    ///
    /// # Returns
    /// - `Err(ConfigError::InvalidOutputLimits)` if `min >= max` or either is not finite. Nothing
    ///   is changed in that case.
    pub fn set_output_limits(&mut self, min: F, max: F) -> Result<(), ConfigError> {
        let Some(span) = Span::new(min, max) else {
            warn!("Rejected output limits [{min:?}, {max:?}]");
            return Err(ConfigError::InvalidOutputLimits);
        };

        let factor = span.rescale_factor(&self.output);
        self.prev_output = clamp_unit(self.prev_output * factor);
        self.output = span;
        Ok(())
    }

    /// Changes the tunings. Safe to call while the loop is running.
    ///
    /// In `Auto` mode the accumulated error is rescaled so that the integral contribution to the
    /// output is the same before and after the change (bumpless re-tuning). If the new tunings
    /// disable integral action, the accumulated error is cleared instead.
    ///
    /// # Arguments
    /// - `kc`: Controller gain, non-zero.
    /// - `tau_i`: Integral time in seconds, zero disables integral action.
    /// - `tau_d`: Derivative time in seconds.
    pub fn set_tunings(&mut self, kc: F, tau_i: F, tau_d: F) -> Result<(), ConfigError> {
        if let Err(e) = validate_tunings(kc, tau_i, tau_d) {
            warn!("Rejected tunings kc={kc:?} tau_i={tau_i:?} tau_d={tau_d:?}: {e:?}");
            return Err(e);
        }

        let tau_r = integral_rate(tau_i, self.interval_secs);

        if self.mode == Mode::Auto {
            self.accumulated_error = if tau_r == F::zero() {
                F::zero()
            } else {
                self.accumulated_error * (self.kc * self.tau_r) / (kc * tau_r)
            };
        }

        debug!("Tunings changed to kc={kc:?} tau_i={tau_i:?} tau_d={tau_d:?}");
        self.kc = kc;
        self.tau_i = tau_i;
        self.tau_d = tau_d;
        self.tau_r = tau_r;
        self.tau_d_rate = tau_d / self.interval_secs;
        Ok(())
    }

    /// Re-synchronizes the internal state with the current inputs so the next `compute` starts
    /// without a transient. Called automatically on the `Manual` to `Auto` transition.
    ///
    /// The previous output is taken from the bias if feed-forward is enabled, otherwise from the
    /// last computed output. The previous process value is taken from the current process value.
    /// The accumulated error is cleared.
    pub fn reset(&mut self) {
        let held = if self.feed_forward {
            self.bias
        } else {
            self.last_output
        };
        self.prev_output = self.output.normalize_clamped(held);
        self.prev_process_value = self.input.normalize_clamped(self.process_value);
        self.accumulated_error = F::zero();
        debug!("Controller reset, holding output at {held:?}");
    }

    /// Switches between manual and automatic control. Entering `Auto` from `Manual` resets the
    /// controller; every other transition only records the mode.
    pub fn set_mode(&mut self, mode: Mode) {
        match (self.mode, mode) {
            (Mode::Manual, Mode::Auto) => {
                debug!("Switching to automatic control");
                self.reset();
            }
            (Mode::Auto, Mode::Manual) => debug!("Switching to manual control"),
            _ => {}
        }
        self.mode = mode;
    }

    /// Changes the nominal sample interval, rescaling the per-sample coefficients and the
    /// accumulated error so that the integral contribution to the output carries over.
    ///
    /// # Returns
    /// - `Err(ConfigError::InvalidSampleInterval)` if the interval is zero. Nothing is changed in
    ///   that case.
    pub fn set_interval(&mut self, interval: Duration) -> Result<(), ConfigError> {
        let secs = match interval_secs::<F>(interval) {
            Ok(secs) => secs,
            Err(e) => {
                warn!("Rejected sample interval {interval:?}");
                return Err(e);
            }
        };

        let ratio = secs / self.interval_secs;
        self.tau_r = self.tau_r * ratio;
        self.accumulated_error = self.accumulated_error / ratio;
        self.tau_d_rate = self.tau_d_rate * ratio;
        self.interval = interval;
        self.interval_secs = secs;
        debug!("Sample interval changed to {interval:?}");
        Ok(())
    }

    /// Sets the setpoint as a real-world value.
    pub fn set_setpoint(&mut self, setpoint: F) {
        self.setpoint = setpoint;
    }

    /// Returns the setpoint.
    pub fn setpoint(&self) -> F {
        self.setpoint
    }

    /// Sets the process value as a real-world value.
    pub fn set_process_value(&mut self, process_value: F) {
        self.process_value = process_value;
    }

    /// Returns the process value.
    pub fn process_value(&self) -> F {
        self.process_value
    }

    /// Sets the feed-forward bias as a real-world output value and enables feed-forward.
    pub fn set_bias(&mut self, bias: F) {
        self.bias = bias;
        self.feed_forward = true;
    }

    /// Returns the feed-forward bias. It only contributes to the output while feed-forward is
    /// enabled.
    pub fn bias(&self) -> F {
        self.bias
    }

    /// Enables or disables feed-forward without changing the stored bias.
    pub fn set_feed_forward(&mut self, enabled: bool) {
        self.feed_forward = enabled;
    }

    /// Returns whether the bias contributes to the output.
    pub fn is_feed_forward_enabled(&self) -> bool {
        self.feed_forward
    }

    /// Runs one step of the control law and returns the output as a real-world value within the
    /// output range.
    ///
    /// The output is computed regardless of the mode; in `Manual` it should not be applied to the
    /// actuator.
    pub fn compute(&mut self) -> F {
        let zero = F::zero();

        let process_value = self.input.normalize_clamped(self.process_value);
        let setpoint = self.input.normalize_clamped(self.setpoint);
        let error = setpoint - process_value;

        // Only integrate if the output is not pegged at the limit the error pushes towards
        let pinned_high = self.prev_output >= F::one() && error > zero;
        let pinned_low = self.prev_output <= zero && error < zero;
        if !pinned_high && !pinned_low {
            self.accumulated_error = self.accumulated_error + error;
        }

        let slope = (process_value - self.prev_process_value) / self.interval_secs;

        let bias = if self.feed_forward {
            self.output.normalize(self.bias)
        } else {
            zero
        };

        let output = clamp_unit(
            bias + self.kc
                * (error + self.tau_r * self.accumulated_error - self.tau_d_rate * slope),
        );

        self.prev_output = output;
        self.prev_process_value = process_value;
        self.last_output = self.output.denormalize(output);
        self.last_output
    }

    /// Returns the real-world output of the last `compute`, or zero before the first one.
    pub fn output(&self) -> F {
        self.last_output
    }

    /// Returns the controller gain.
    pub fn kc(&self) -> F {
        self.kc
    }

    /// Returns the integral time.
    pub fn tau_i(&self) -> F {
        self.tau_i
    }

    /// Returns the derivative time.
    pub fn tau_d(&self) -> F {
        self.tau_d
    }

    /// Convenience method that returns the gain, integral time and derivative time as a tuple.
    pub fn tunings(&self) -> (F, F, F) {
        (self.kc, self.tau_i, self.tau_d)
    }

    /// Returns the nominal sample interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the input range.
    pub fn input_limits(&self) -> Span<F> {
        self.input
    }

    /// Returns the output range.
    pub fn output_limits(&self) -> Span<F> {
        self.output
    }

    /// Returns the current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns whether the controller is in `Auto` mode.
    pub fn is_auto(&self) -> bool {
        self.mode == Mode::Auto
    }
}

impl<F: AtomicFloat> Controller<F> {
    /// Runs [`Controller::compute`] and publishes the result to `cell`, from which other
    /// execution contexts may read it without locking.
    pub fn compute_and_publish(&mut self, cell: &OutputCell<F>) -> F {
        let output = self.compute();
        cell.set(output);
        output
    }
}
