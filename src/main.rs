// src/main.rs - Command line front end for the SCARA controller
use clap::{Parser, Subcommand};
use scara_rs::config::{self, Config, ConfigError, PwmDriver};
use scara_rs::hardware::{HardwareError, MotorId, PwmActuator, SerialPwm, SimulatedPwm};
use scara_rs::motion::{Kinematics, MotionController, MotionError, VerticalMove};
use scara_rs::geometry::Point2;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;

/// Two-arm SCARA controller
#[derive(Parser, Debug)]
#[command(name = "scara", version, about = "Drive a two-arm SCARA robot through its PWM servo board.")]
struct Cli {
    /// Path to a TOML config file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the home position with its joint angles and pulses
    Status,
    /// Move the tool straight to a position
    Move {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Move the tool along a straight line through evenly spaced waypoints
    Interpolate {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
        /// Number of waypoints (config value when omitted)
        #[arg(long)]
        steps: Option<usize>,
        /// Pause between waypoints in milliseconds (config value when omitted)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Raise the tool
    Lift {
        #[arg(long)]
        time_ms: Option<u64>,
        #[arg(long)]
        pulse: Option<u32>,
    },
    /// Lower the tool
    Lower {
        #[arg(long)]
        time_ms: Option<u64>,
        #[arg(long)]
        pulse: Option<u32>,
    },
    /// Drive one joint to an angle in degrees
    SetAngle {
        #[arg(allow_negative_numbers = true)]
        angle: f64,
        /// motor1 or motor2
        motor: MotorId,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Hardware(#[from] HardwareError),
    #[error("{0}")]
    Motion(#[from] MotionError),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Motion(e) if e.is_fatal() => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

#[derive(Debug, Serialize)]
struct Status {
    position: Point2,
    angles: Option<[f64; 2]>,
    pulses: Option<[u32; 2]>,
    driver: PwmDriver,
}

/// Human-readable line plus a JSON value for `--json`.
struct Output {
    text: String,
    json: serde_json::Value,
}

impl Output {
    fn new<T: Serialize>(text: String, value: &T) -> Self {
        let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        Self { text, json }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(output) => {
            if cli.json {
                println!("{}", output.json);
            } else {
                println!("{}", output.text);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            if cli.json {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
            } else {
                eprintln!("Error: {}", e);
            }
            e.exit_code()
        }
    }
}

fn load(cli: &Cli) -> Result<Config, CliError> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            config::load_config(&path.to_string_lossy())?
        }
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

fn open_actuator(config: &Config) -> Result<Box<dyn PwmActuator>, CliError> {
    match config.pwm.driver {
        PwmDriver::Simulated => {
            tracing::info!("Using simulated PWM driver");
            Ok(Box::new(SimulatedPwm::new()))
        }
        PwmDriver::Serial => {
            tracing::info!("PWM board: {} @ {} baud", config.pwm.serial, config.pwm.baud);
            let port = SerialPwm::open(
                &config.pwm.serial,
                config.pwm.baud,
                config.pwm.response_timeout(),
            )?;
            Ok(Box::new(port))
        }
    }
}

async fn run(cli: &Cli) -> Result<Output, CliError> {
    let config = load(cli)?;

    if let Commands::Status = cli.command {
        return Ok(status(&config));
    }

    let mut controller = MotionController::new(&config, open_actuator(&config)?)?;
    controller.initialize().await?;

    let output = match cli.command {
        Commands::Status => status(&config),
        Commands::Move { x, y } => {
            let report = controller.move_to(Point2::new(x, y)).await?;
            let text = format!(
                "Moved to {} (angles {:.2}/{:.2}, pulses {}/{})",
                report.solution.target,
                report.solution.arm1.angle,
                report.solution.arm2.angle,
                report.pulses[0],
                report.pulses[1]
            );
            Output::new(text, &report)
        }
        Commands::Interpolate { x, y, steps, delay_ms } => {
            let steps = steps.unwrap_or(config.motion.steps);
            let delay = delay_ms.map(Duration::from_millis).unwrap_or(config.motion.delay());
            let report = controller.interpolated_move(Point2::new(x, y), steps, delay).await?;
            let text = format!("Reached {} in {} waypoints", report.position, report.waypoints);
            Output::new(text, &report)
        }
        Commands::Lift { time_ms, pulse } => {
            let mv = vertical(VerticalMove::lift(controller.lift_config()), time_ms, pulse);
            controller.lift(mv).await?;
            Output::new("Tool lifted".to_string(), &serde_json::json!({ "lifted": true }))
        }
        Commands::Lower { time_ms, pulse } => {
            let mv = vertical(VerticalMove::lower(controller.lift_config()), time_ms, pulse);
            controller.lower(mv).await?;
            Output::new("Tool lowered".to_string(), &serde_json::json!({ "lowered": true }))
        }
        Commands::SetAngle { angle, motor } => {
            let pulse = controller.set_joint_angle(motor, angle).await?;
            let text = format!("Set {} to {:.2} deg (pulse {})", motor, angle, pulse);
            let value = serde_json::json!({ "motor": motor, "angle": angle, "pulse": pulse });
            Output::new(text, &value)
        }
    };
    Ok(output)
}

fn vertical(mut mv: VerticalMove, time_ms: Option<u64>, pulse: Option<u32>) -> VerticalMove {
    if let Some(ms) = time_ms {
        mv.hold = Duration::from_millis(ms);
    }
    if let Some(pulse) = pulse {
        mv.pulse = pulse;
    }
    mv
}

fn status(config: &Config) -> Output {
    let position = config.robot.home();
    let solution = config.robot.kinematics().inverse(position).ok();
    let angles = solution.map(|s| [s.arm1.angle, s.arm2.angle]);
    let pulses = solution.and_then(|s| {
        let p1 = config.motors.motor1.angle_to_pulse(MotorId::Motor1, s.arm1.angle).ok()?;
        let p2 = config.motors.motor2.angle_to_pulse(MotorId::Motor2, s.arm2.angle).ok()?;
        Some([p1, p2])
    });
    let status = Status { position, angles, pulses, driver: config.pwm.driver };

    let mut text = format!("Position: {}", position);
    if let Some([a1, a2]) = angles {
        text.push_str(&format!("\nAngles:   {:.2} / {:.2} deg", a1, a2));
    }
    if let Some([p1, p2]) = pulses {
        text.push_str(&format!("\nPulses:   {} / {} us", p1, p2));
    }
    text.push_str(&format!("\nDriver:   {:?}", config.pwm.driver));
    Output::new(text, &status)
}
