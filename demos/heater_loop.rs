//! Closed-loop heat-up of a simulated oven, printed as CSV
//! This demo requires the `--features simulation` flag to be enabled.

#[cfg(feature = "simulation")]
pub fn main() {
    use std::time::Duration;

    use span_pid::pid::{Controller, ControllerConfigBuilder, Mode};
    use span_pid::shared::OutputCell;
    use span_pid::sim::ThermalPlant;

    const FIXED_STEP_SIZE_MS: u64 = 500;
    const FIXED_STEP_SIZE_S: f64 = FIXED_STEP_SIZE_MS as f64 * 0.001;

    let cfg = ControllerConfigBuilder::default()
        .tunings(3.0, 60.0, 2.0)
        .sample_interval(Duration::from_millis(FIXED_STEP_SIZE_MS))
        .input_limits(0.0, 300.0)
        .output_limits(0.0, 100.0)
        .build()
        .unwrap();
    let mut pid = Controller::from_config(cfg).unwrap();
    let heater_duty = OutputCell::new(0.0);

    let plant = ThermalPlant::default();
    let mut state = plant.ambient_state();

    println!("time,setpoint,temperature,duty,mode");
    for i in 0..8000usize {
        let time = i as f64 * FIXED_STEP_SIZE_S;

        // Preheat by hand at 30% duty, then hand over to the controller with a soak profile
        let setpoint = match time {
            t if t < 600.0 => plant.h(state),
            t if t < 2400.0 => 150.0,
            _ => 200.0,
        };
        if time >= 600.0 && !pid.is_auto() {
            pid.set_bias(30.0);
            pid.set_mode(Mode::Auto);
        }

        pid.set_setpoint(setpoint);
        pid.set_process_value(plant.h(state));
        pid.compute_and_publish(&heater_duty);

        let duty = if pid.is_auto() { heater_duty.get() } else { 30.0 };
        state = plant.step(state, duty / 100.0, FIXED_STEP_SIZE_S);

        if i % 20 == 0 {
            println!(
                "{time:.1},{setpoint:.2},{:.2},{duty:.2},{:?}",
                plant.h(state),
                pid.mode()
            );
        }
    }
}

#[cfg(not(feature = "simulation"))]
fn main() {
    eprintln!("This demo requires `--features simulation` to run.");
}
